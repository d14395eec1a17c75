//! Control-plane transport targets.

use crate::constants::transport::{PIPE_SCHEME, VSOCK_SCHEME};
use crate::errors::{PortliteError, PortliteResult};

/// Where the control service listens.
///
/// Exactly one target is used per process. `Pipe` is a Unix domain socket path
/// on Unix hosts and a named pipe (`\\.\pipe\...`) on Windows.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ControlTarget {
    /// Unix socket or Windows named pipe
    Pipe { path: String },

    /// AF_VSOCK port on the host
    Vsock { port: u32 },
}

impl ControlTarget {
    /// Create a pipe target.
    pub fn pipe(path: impl Into<String>) -> Self {
        Self::Pipe { path: path.into() }
    }

    /// Create a vsock target.
    pub fn vsock(port: u32) -> Self {
        Self::Vsock { port }
    }

    /// Pick the target from the two optional settings.
    ///
    /// A non-empty pipe wins over vsock. Empty strings count as unset.
    pub fn resolve(pipe: Option<&str>, vsock: Option<&str>) -> PortliteResult<Self> {
        let pipe = pipe.map(str::trim).filter(|p| !p.is_empty());
        let vsock = vsock.map(str::trim).filter(|v| !v.is_empty());

        match (pipe, vsock) {
            (Some(path), _) => Ok(Self::pipe(path)),
            (None, Some(port)) => {
                let port = port.parse::<u32>().map_err(|e| {
                    PortliteError::Config(format!("invalid control-vsock port '{}': {}", port, e))
                })?;
                Ok(Self::vsock(port))
            }
            (None, None) => Err(PortliteError::Config(
                "Please supply either -control-vsock or -control-pipe arguments".into(),
            )),
        }
    }

    /// Get the URI representation of this target.
    pub fn to_uri(&self) -> String {
        match self {
            ControlTarget::Pipe { path } => format!("{}{}", PIPE_SCHEME, path),
            ControlTarget::Vsock { port } => format!("{}{}", VSOCK_SCHEME, port),
        }
    }
}

impl std::fmt::Display for ControlTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}
