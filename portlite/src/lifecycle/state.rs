//! Exposure lifecycle states and valid transitions between them.

use portlite_shared::{PortliteError, PortliteResult};

/// Phase of a [`PortExposer`](super::PortExposer) run.
///
/// ```text
/// Configuring → Binding → Exposing → Holding → Releasing → Released
///                  ↓          ↓
///                Failed     Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Options resolved, nothing attempted yet.
    Configuring,
    /// Applying the local-bind policy.
    Binding,
    /// Connecting and sending the expose request.
    Exposing,
    /// Forward is live; waiting for a termination signal.
    Holding,
    /// Sending the unexpose request.
    Releasing,
    /// Forward withdrawn (or withdrawal attempted). Terminal.
    Released,
    /// Run aborted before the forward was established. Terminal.
    Failed,
}

impl LifecycleState {
    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, target),
            (Configuring, Binding)
                | (Binding, Exposing)
                | (Binding, Failed)
                | (Exposing, Holding)
                | (Exposing, Failed)
                | (Holding, Releasing)
                | (Releasing, Released)
        )
    }

    /// Validated transition.
    pub fn transition_to(&mut self, target: LifecycleState) -> PortliteResult<()> {
        if !self.can_transition_to(target) {
            return Err(PortliteError::InvalidState(format!(
                "Cannot transition from {} to {}",
                self, target
            )));
        }
        tracing::debug!(from = %self, to = %target, "Lifecycle transition");
        *self = target;
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Configuring => "configuring",
            LifecycleState::Binding => "binding",
            LifecycleState::Exposing => "exposing",
            LifecycleState::Holding => "holding",
            LifecycleState::Releasing => "releasing",
            LifecycleState::Released => "released",
            LifecycleState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
