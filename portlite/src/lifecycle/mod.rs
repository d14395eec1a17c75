//! Exposure lifecycle orchestration.
//!
//! [`PortExposer::run`] sequences one process invocation:
//! local-bind policy → connect → expose → report → wait for shutdown → unexpose.

mod exposure;
mod state;

pub use exposure::Exposure;
pub use state::LifecycleState;

use std::pin::pin;
use std::sync::Arc;

use portlite_shared::{ForwardingRule, PortliteError, PortliteResult};

use crate::bind::{LocalBinder, SocketBinder, apply_local_bind};
use crate::options::ExposeOptions;
use crate::portal::{Connector, ControlClient, PortControl, SocketConnector};

/// Receives the success notification once the forward is live.
pub trait Reporter: Send + Sync {
    fn exposed(&self, rule: &ForwardingRule);
}

/// Reporter that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn exposed(&self, rule: &ForwardingRule) {
        tracing::info!(%rule, "Forward is live");
    }
}

/// Drives a single forward from request to release.
///
/// One exposer handles one rule, once. A second [`run`](Self::run) fails
/// with [`PortliteError::InvalidState`].
pub struct PortExposer {
    options: ExposeOptions,
    connector: Arc<dyn Connector>,
    binder: Arc<dyn LocalBinder>,
    state: LifecycleState,
}

impl PortExposer {
    /// Create an exposer using real sockets for both the local bind and the
    /// control channel.
    pub fn new(options: ExposeOptions) -> Self {
        Self {
            options,
            connector: Arc::new(SocketConnector),
            binder: Arc::new(SocketBinder),
            state: LifecycleState::Configuring,
        }
    }

    /// Replace the channel provider.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the local binder.
    pub fn with_binder(mut self, binder: Arc<dyn LocalBinder>) -> Self {
        self.binder = binder;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Expose the configured rule, hold it until `shutdown` resolves, then
    /// release it.
    ///
    /// Returns `Ok(())` after a shutdown-triggered release (release errors are
    /// logged, not returned). Returns the error if the forward could not be
    /// established; in that case no release is attempted.
    ///
    /// `shutdown` is watched from the start. If it resolves while the expose
    /// request is outstanding, the run fails with [`PortliteError::Expose`]
    /// after a bounded `unexpose` on a fresh connection, since the service may
    /// already have applied the forward.
    pub async fn run<S>(&mut self, reporter: &dyn Reporter, shutdown: S) -> PortliteResult<()>
    where
        S: Future<Output = ()>,
    {
        if self.state != LifecycleState::Configuring {
            return Err(PortliteError::InvalidState(format!(
                "exposer already ran (state: {})",
                self.state
            )));
        }

        let mut shutdown = pin!(shutdown);
        let established = {
            let establish = self.establish();
            tokio::select! {
                result = establish => Some(result),
                () = &mut shutdown => None,
            }
        };

        let exposure = match established {
            Some(Ok(exposure)) => exposure,
            Some(Err(e)) => {
                tracing::debug!(from = %self.state, "Lifecycle failed");
                self.state = LifecycleState::Failed;
                return Err(e);
            }
            None => return Err(self.abandon().await),
        };

        self.state.transition_to(LifecycleState::Holding)?;
        reporter.exposed(exposure.rule());

        let state = &mut self.state;
        exposure
            .hold(async {
                shutdown.await;
                tracing::info!("Termination signal received");
                state.transition_to(LifecycleState::Releasing)
            })
            .await?;

        self.state.transition_to(LifecycleState::Released)
    }

    async fn establish(&mut self) -> PortliteResult<Exposure> {
        let rule = &self.options.rule;

        self.state.transition_to(LifecycleState::Binding)?;
        let outcome = apply_local_bind(rule, self.options.local_bind, self.binder.as_ref())?;
        tracing::debug!(?outcome, mode = %self.options.local_bind, "Local bind policy applied");

        self.state.transition_to(LifecycleState::Exposing)?;
        tracing::info!(%rule, target = %self.options.target, "Exposing port");
        let client = ControlClient::connect(self.connector.as_ref(), &self.options.target)
            .await
            .map_err(|e| PortliteError::Expose {
                rule: rule.to_string(),
                reason: e.to_string(),
            })?;

        Exposure::acquire(Arc::new(client), rule.clone(), self.options.release_timeout).await
    }

    /// Give up on a run interrupted before the forward was confirmed.
    async fn abandon(&mut self) -> PortliteError {
        let phase = self.state;
        self.state = LifecycleState::Failed;
        tracing::info!(%phase, "Termination signal received before the port was exposed");

        if phase == LifecycleState::Exposing {
            self.withdraw_unconfirmed().await;
        }

        PortliteError::Expose {
            rule: self.options.rule.to_string(),
            reason: "interrupted by termination signal".into(),
        }
    }

    /// Best-effort `unexpose` for a request whose reply never arrived.
    ///
    /// Uses a new connection: the old one still has the expose reply pending.
    async fn withdraw_unconfirmed(&self) {
        let rule = &self.options.rule;
        let timeout = self.options.release_timeout;

        let withdraw = async {
            let client =
                ControlClient::connect(self.connector.as_ref(), &self.options.target).await?;
            client.unexpose(rule).await
        };

        match tokio::time::timeout(timeout, withdraw).await {
            Ok(Ok(())) => tracing::info!(%rule, "Withdrew unconfirmed forward"),
            Ok(Err(e)) => tracing::warn!(%rule, "Failed to withdraw unconfirmed forward: {}", e),
            Err(_) => tracing::warn!(
                %rule,
                timeout_ms = timeout.as_millis() as u64,
                "Timed out withdrawing unconfirmed forward"
            ),
        }
    }
}
