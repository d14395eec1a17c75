//! Connection management.
//!
//! Turns a [`ControlTarget`] into a connected byte stream.

use async_trait::async_trait;
use portlite_shared::{ControlTarget, PortliteResult};
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream to the control service.
pub trait ControlStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ControlStream for T {}

/// Owned, type-erased control stream.
pub type BoxedStream = Box<dyn ControlStream>;

/// Opens byte channels to a control target.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open one connected stream to `target`.
    async fn connect(&self, target: &ControlTarget) -> PortliteResult<BoxedStream>;
}

/// Connects with the platform's sockets: Unix socket or named pipe for
/// `pipe://`, AF_VSOCK to the host CID for `vsock://`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketConnector;

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self, target: &ControlTarget) -> PortliteResult<BoxedStream> {
        match target {
            ControlTarget::Pipe { path } => {
                tracing::debug!("Connecting via pipe: {}", path);
                connect_pipe(path).await
            }
            ControlTarget::Vsock { port } => {
                tracing::debug!("Connecting via vsock: host:{}", port);
                connect_vsock(*port).await
            }
        }
    }
}

#[cfg(unix)]
async fn connect_pipe(path: &str) -> PortliteResult<BoxedStream> {
    let stream = tokio::net::UnixStream::connect(path).await?;

    tracing::debug!("Connected via Unix socket");
    Ok(Box::new(stream))
}

#[cfg(windows)]
async fn connect_pipe(path: &str) -> PortliteResult<BoxedStream> {
    use tokio::net::windows::named_pipe::ClientOptions;

    let client = ClientOptions::new().open(path)?;

    tracing::debug!("Connected via named pipe");
    Ok(Box::new(client))
}

#[cfg(not(any(unix, windows)))]
async fn connect_pipe(path: &str) -> PortliteResult<BoxedStream> {
    Err(portlite_shared::PortliteError::Unsupported(format!(
        "pipe transport not available on this platform ({})",
        path
    )))
}

#[cfg(target_os = "linux")]
async fn connect_vsock(port: u32) -> PortliteResult<BoxedStream> {
    use portlite_shared::constants::transport::VSOCK_HOST_CID;
    use tokio_vsock::{VsockAddr, VsockStream};

    let stream = VsockStream::connect(VsockAddr::new(VSOCK_HOST_CID, port)).await?;

    tracing::debug!("Connected via vsock");
    Ok(Box::new(stream))
}

#[cfg(not(target_os = "linux"))]
async fn connect_vsock(port: u32) -> PortliteResult<BoxedStream> {
    Err(portlite_shared::PortliteError::Unsupported(format!(
        "vsock transport is Linux-only (port: {})",
        port
    )))
}
