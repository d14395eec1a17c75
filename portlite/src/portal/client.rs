//! Control service client.

use async_trait::async_trait;
use portlite_shared::protocol::{decode_line, encode_line};
use portlite_shared::{
    ControlRequest, ControlResponse, ControlTarget, ForwardingRule, PortliteError, PortliteResult,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::connection::{BoxedStream, Connector};

/// Expose/unexpose operations of the control service.
#[async_trait]
pub trait PortControl: Send + Sync {
    /// Ask the service to start forwarding `rule`.
    async fn expose(&self, rule: &ForwardingRule) -> PortliteResult<()>;

    /// Ask the service to stop forwarding `rule`.
    async fn unexpose(&self, rule: &ForwardingRule) -> PortliteResult<()>;
}

/// Request/response client over one control stream.
///
/// The stream sits behind an async mutex, so at most one request is in
/// flight at a time.
pub struct ControlClient {
    peer: String,
    stream: Mutex<BufReader<BoxedStream>>,
}

impl ControlClient {
    /// Wrap an already connected stream.
    pub fn new(stream: BoxedStream, peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            stream: Mutex::new(BufReader::new(stream)),
        }
    }

    /// Open a stream to `target` and wrap it.
    pub async fn connect(connector: &dyn Connector, target: &ControlTarget) -> PortliteResult<Self> {
        let stream = connector.connect(target).await?;
        tracing::debug!(%target, "Control channel connected");
        Ok(Self::new(stream, target.to_uri()))
    }

    /// Send one request and read its response line.
    async fn call(&self, request: &ControlRequest) -> PortliteResult<ControlResponse> {
        let line = encode_line(request)?;
        let mut stream = self.stream.lock().await;

        tracing::trace!(op = request.op(), peer = %self.peer, "Sending control request");
        stream.get_mut().write_all(&line).await?;
        stream.get_mut().flush().await?;

        let mut reply = String::new();
        if stream.read_line(&mut reply).await? == 0 {
            return Err(PortliteError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "control connection closed before responding",
            )));
        }
        decode_line(&reply)
    }
}

#[async_trait]
impl PortControl for ControlClient {
    async fn expose(&self, rule: &ForwardingRule) -> PortliteResult<()> {
        tracing::debug!(%rule, "Sending expose request");
        let request = ControlRequest::Expose { port: rule.clone() };

        match self.call(&request).await {
            Ok(ControlResponse::Ok) => {
                tracing::debug!(%rule, "Port exposed");
                Ok(())
            }
            Ok(ControlResponse::Error { message }) => {
                tracing::debug!(%rule, "Expose rejected: {}", message);
                Err(PortliteError::Expose {
                    rule: rule.to_string(),
                    reason: message,
                })
            }
            Err(e) => Err(PortliteError::Expose {
                rule: rule.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn unexpose(&self, rule: &ForwardingRule) -> PortliteResult<()> {
        tracing::debug!(%rule, "Sending unexpose request");
        let request = ControlRequest::Unexpose { port: rule.clone() };

        match self.call(&request).await {
            Ok(ControlResponse::Ok) => Ok(()),
            Ok(ControlResponse::Error { message }) => Err(PortliteError::Unexpose {
                rule: rule.to_string(),
                reason: message,
            }),
            Err(e) => Err(PortliteError::Unexpose {
                rule: rule.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
