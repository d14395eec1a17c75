//! Test doubles for portlite: an in-process control service, a connector that
//! reaches it over in-memory pipes, and a recording local binder.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use portlite::{BoxedStream, Connector, LocalBinder};
use portlite_shared::protocol::{decode_line, encode_line};
use portlite_shared::{
    ControlRequest, ControlResponse, ControlTarget, ForwardingRule, PortliteError, PortliteResult,
    Protocol,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Notify;

/// How the fake service answers a given operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject(String),
    /// Never answer.
    Stall,
}

#[derive(Debug)]
struct ServiceInner {
    requests: Mutex<Vec<ControlRequest>>,
    expose_reply: Mutex<Reply>,
    unexpose_reply: Mutex<Reply>,
    changed: Notify,
}

/// In-process control service speaking the NDJSON protocol.
///
/// Cheap to clone; clones share the request log.
#[derive(Debug, Clone)]
pub struct FakeControlService {
    inner: Arc<ServiceInner>,
}

impl Default for FakeControlService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeControlService {
    /// A service that accepts everything.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                requests: Mutex::new(Vec::new()),
                expose_reply: Mutex::new(Reply::Accept),
                unexpose_reply: Mutex::new(Reply::Accept),
                changed: Notify::new(),
            }),
        }
    }

    pub fn with_expose_reply(self, reply: Reply) -> Self {
        *self.inner.expose_reply.lock() = reply;
        self
    }

    pub fn with_unexpose_reply(self, reply: Reply) -> Self {
        *self.inner.unexpose_reply.lock() = reply;
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.inner.requests.lock().clone()
    }

    /// Rules of received `expose` requests.
    pub fn exposed(&self) -> Vec<ForwardingRule> {
        self.filter(|r| matches!(r, ControlRequest::Expose { .. }))
    }

    /// Rules of received `unexpose` requests.
    pub fn unexposed(&self) -> Vec<ForwardingRule> {
        self.filter(|r| matches!(r, ControlRequest::Unexpose { .. }))
    }

    fn filter(&self, keep: impl Fn(&ControlRequest) -> bool) -> Vec<ForwardingRule> {
        self.inner
            .requests
            .lock()
            .iter()
            .filter(|r| keep(*r))
            .map(|r| r.rule().clone())
            .collect()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.inner.changed.notified();
            if self.inner.requests.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Serve one connection until the peer hangs up.
    pub async fn serve<S>(&self, stream: S) -> PortliteResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        let mut line = String::new();

        loop {
            line.clear();
            if stream.read_line(&mut line).await? == 0 {
                return Ok(());
            }

            let request: ControlRequest = decode_line(&line)?;
            let reply = match request {
                ControlRequest::Expose { .. } => self.inner.expose_reply.lock().clone(),
                ControlRequest::Unexpose { .. } => self.inner.unexpose_reply.lock().clone(),
            };
            self.inner.requests.lock().push(request);
            self.inner.changed.notify_waiters();

            let response = match reply {
                Reply::Accept => ControlResponse::Ok,
                Reply::Reject(message) => ControlResponse::error(message),
                Reply::Stall => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            };
            stream.get_mut().write_all(&encode_line(&response)?).await?;
            stream.get_mut().flush().await?;
        }
    }
}

/// Connector that serves each connection from a [`FakeControlService`] over
/// an in-memory duplex pipe, whatever the target.
#[derive(Debug, Clone)]
pub struct DuplexConnector {
    service: FakeControlService,
    connects: Arc<Mutex<Vec<ControlTarget>>>,
    refuse: bool,
}

impl DuplexConnector {
    pub fn new(service: FakeControlService) -> Self {
        Self {
            service,
            connects: Arc::new(Mutex::new(Vec::new())),
            refuse: false,
        }
    }

    /// A connector whose every connect fails with "connection refused".
    pub fn refusing(service: FakeControlService) -> Self {
        Self {
            refuse: true,
            ..Self::new(service)
        }
    }

    /// Targets connected to so far.
    pub fn connects(&self) -> Vec<ControlTarget> {
        self.connects.lock().clone()
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self, target: &ControlTarget) -> PortliteResult<BoxedStream> {
        self.connects.lock().push(target.clone());
        if self.refuse {
            return Err(PortliteError::Transport(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        let service = self.service.clone();
        tokio::spawn(async move {
            let _ = service.serve(server).await;
        });
        Ok(Box::new(client))
    }
}

/// Local binder that records calls and answers with a fixed result.
#[derive(Debug, Default)]
pub struct RecordingBinder {
    fail: bool,
    attempts: Mutex<Vec<(Protocol, SocketAddr)>>,
    calls: AtomicUsize,
}

impl RecordingBinder {
    /// Every bind succeeds.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Every bind fails with `AddrInUse`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<(Protocol, SocketAddr)> {
        self.attempts.lock().clone()
    }
}

impl LocalBinder for RecordingBinder {
    fn try_bind(&self, proto: Protocol, addr: SocketAddr) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push((proto, addr));
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "address already in use"));
        }
        Ok(())
    }
}
