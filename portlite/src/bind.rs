//! Local-bind policy.
//!
//! Before asking the control service for a forward, the client may bind the
//! host endpoint on the local network stack. The trial socket is dropped as
//! soon as the bind returns; nothing is held.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::str::FromStr;

use portlite_shared::{ForwardingRule, PortliteError, PortliteResult, Protocol};
use serde::{Deserialize, Serialize};

/// How to treat the local trial bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalBindMode {
    /// Try to bind, and carry on if it fails.
    #[default]
    BestEffort,
    /// Try to bind, and abort if it fails.
    Always,
    /// Never bind locally.
    Never,
}

impl LocalBindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalBindMode::BestEffort => "best-effort",
            LocalBindMode::Always => "always",
            LocalBindMode::Never => "never",
        }
    }
}

impl fmt::Display for LocalBindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocalBindMode {
    type Err = PortliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(LocalBindMode::BestEffort),
            "always" => Ok(LocalBindMode::Always),
            "never" => Ok(LocalBindMode::Never),
            _ => Err(PortliteError::Config(
                "-local-bind argument must be 'best-effort' or 'always' or 'never'".into(),
            )),
        }
    }
}

/// Something that can test whether a host endpoint is bindable.
pub trait LocalBinder: Send + Sync {
    /// Bind `addr` for `proto` and release it again before returning.
    ///
    /// Only tcp and udp rules with a concrete host address get here.
    fn try_bind(&self, proto: Protocol, addr: SocketAddr) -> io::Result<()>;
}

/// Binds real sockets on the local stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketBinder;

impl LocalBinder for SocketBinder {
    fn try_bind(&self, proto: Protocol, addr: SocketAddr) -> io::Result<()> {
        // Sockets are dropped at the end of each branch.
        if proto == Protocol::Udp {
            UdpSocket::bind(addr).map(drop)
        } else {
            TcpListener::bind(addr).map(drop)
        }
    }
}

/// What the policy did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalBindOutcome {
    /// No bind was attempted (mode `never`, unix rule, or wildcard host address).
    Skipped,
    /// The trial bind succeeded.
    Bound,
    /// The trial bind failed and `best-effort` ignored it.
    Ignored,
}

/// Apply `mode` to `rule`.
///
/// Only `always` turns a failed bind into an error.
pub fn apply_local_bind(
    rule: &ForwardingRule,
    mode: LocalBindMode,
    binder: &dyn LocalBinder,
) -> PortliteResult<LocalBindOutcome> {
    if mode == LocalBindMode::Never {
        tracing::debug!(%rule, "Local bind disabled");
        return Ok(LocalBindOutcome::Skipped);
    }

    let Some(addr) = rule.host_socket_addr() else {
        tracing::debug!(%rule, "No concrete host address, skipping local bind");
        return Ok(LocalBindOutcome::Skipped);
    };
    let proto = rule.protocol();

    match binder.try_bind(proto, addr) {
        Ok(()) => {
            tracing::debug!(%proto, %addr, "Local bind succeeded");
            Ok(LocalBindOutcome::Bound)
        }
        Err(source) if mode == LocalBindMode::Always => Err(PortliteError::LocalBind {
            proto: proto.as_str(),
            addr,
            source,
        }),
        Err(e) => {
            tracing::warn!(%proto, %addr, error = %e, "Local bind failed, continuing (best-effort)");
            Ok(LocalBindOutcome::Ignored)
        }
    }
}
