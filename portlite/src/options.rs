//! Options for one exposure run.

use std::time::Duration;

use portlite_shared::constants::lifecycle::DEFAULT_RELEASE_TIMEOUT_SECS;
use portlite_shared::{ControlTarget, ForwardingRule};

use crate::bind::LocalBindMode;

/// Everything a [`PortExposer`](crate::PortExposer) needs, resolved once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposeOptions {
    /// The forward to request.
    pub rule: ForwardingRule,

    /// Where the control service listens.
    pub target: ControlTarget,

    /// Local bind policy.
    ///
    /// Default: best-effort
    pub local_bind: LocalBindMode,

    /// Upper bound for the teardown `unexpose` call.
    ///
    /// Default: 5s
    pub release_timeout: Duration,
}

impl ExposeOptions {
    pub fn new(rule: ForwardingRule, target: ControlTarget) -> Self {
        Self {
            rule,
            target,
            local_bind: LocalBindMode::default(),
            release_timeout: Duration::from_secs(DEFAULT_RELEASE_TIMEOUT_SECS),
        }
    }

    pub fn with_local_bind(mut self, mode: LocalBindMode) -> Self {
        self.local_bind = mode;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }
}
