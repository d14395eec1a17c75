//! Error types shared by every portlite crate.
//!
//! Errors are grouped by the lifecycle phase that produces them so callers
//! can decide what is fatal:
//! - [`PortliteError::Config`] / [`PortliteError::UnsupportedProtocol`]: raised
//!   before any network activity
//! - [`PortliteError::LocalBind`]: fatal only under `local-bind=always`
//! - [`PortliteError::Expose`]: the forward was never established
//! - [`PortliteError::Unexpose`]: teardown problem, logged and swallowed

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result alias used across portlite.
pub type PortliteResult<T> = Result<T, PortliteError>;

#[derive(Debug, Error)]
pub enum PortliteError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Rule construction was given a protocol other than tcp/udp/unix.
    #[error("unknown protocol {0}. Use tcp, udp or unix")]
    UnsupportedProtocol(String),

    /// The local host port could not be reserved.
    #[error("local bind on {proto}/{addr} failed: {source}")]
    LocalBind {
        proto: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The control service rejected the forward, or the channel failed mid-request.
    #[error("expose {rule} failed: {reason}")]
    Expose { rule: String, reason: String },

    /// Withdrawing the forward failed or timed out.
    #[error("unexpose {rule} failed: {reason}")]
    Unexpose { rule: String, reason: String },

    /// Byte channel could not be opened, or broke.
    #[error("transport: {0}")]
    Transport(#[from] io::Error),

    /// The peer sent something that is not a valid control message.
    #[error("protocol: {0}")]
    Protocol(String),

    /// Operation not valid in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation not available on this platform.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for PortliteError {
    fn from(err: serde_json::Error) -> Self {
        PortliteError::Protocol(err.to_string())
    }
}
