//! Exposure guard.
//!
//! An [`Exposure`] exists only while a forward is live on the control
//! service. Releasing it sends `unexpose` with a bounded timeout; dropping it
//! unreleased schedules the same call on the current runtime.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use portlite_shared::{ForwardingRule, PortliteError, PortliteResult};

use crate::portal::PortControl;

/// A live forward. Release is guaranteed on every exit path from
/// [`Exposure::hold`].
pub struct Exposure {
    control: Option<Arc<dyn PortControl>>,
    rule: ForwardingRule,
    release_timeout: Duration,
}

impl Exposure {
    /// Expose `rule` through `control`.
    ///
    /// Nothing needs releasing when this fails.
    pub async fn acquire(
        control: Arc<dyn PortControl>,
        rule: ForwardingRule,
        release_timeout: Duration,
    ) -> PortliteResult<Self> {
        control.expose(&rule).await?;
        tracing::info!(%rule, "Port exposed");

        Ok(Self {
            control: Some(control),
            rule,
            release_timeout,
        })
    }

    /// The exposed rule.
    pub fn rule(&self) -> &ForwardingRule {
        &self.rule
    }

    /// Withdraw the forward. Errors and timeouts are returned, never panicked.
    pub async fn release(mut self) -> PortliteResult<()> {
        match self.control.take() {
            Some(control) => release_with_timeout(control, &self.rule, self.release_timeout).await,
            None => Ok(()),
        }
    }

    /// Run `body` while the forward is live, then release it.
    ///
    /// The release runs whether `body` returns `Ok`, returns `Err`, or panics
    /// (the panic is resumed after the release). A failed release is logged
    /// and does not change the result of `body`.
    pub async fn hold<F, T>(self, body: F) -> PortliteResult<T>
    where
        F: Future<Output = PortliteResult<T>>,
    {
        let outcome = AssertUnwindSafe(body).catch_unwind().await;

        let rule = self.rule.clone();
        if let Err(e) = self.release().await {
            tracing::warn!(%rule, "Failed to release forward: {}", e);
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

async fn release_with_timeout(
    control: Arc<dyn PortControl>,
    rule: &ForwardingRule,
    timeout: Duration,
) -> PortliteResult<()> {
    tracing::debug!(%rule, timeout_ms = timeout.as_millis() as u64, "Releasing forward");

    match tokio::time::timeout(timeout, control.unexpose(rule)).await {
        Ok(Ok(())) => {
            tracing::info!(%rule, "Port unexposed");
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PortliteError::Unexpose {
            rule: rule.to_string(),
            reason: format!("timed out after {}ms", timeout.as_millis()),
        }),
    }
}

impl Drop for Exposure {
    fn drop(&mut self) {
        let Some(control) = self.control.take() else {
            return;
        };

        // Dropped without release, e.g. the holding task was cancelled.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(rule = %self.rule, "Exposure dropped unreleased, scheduling unexpose");
                let rule = self.rule.clone();
                let timeout = self.release_timeout;
                handle.spawn(async move {
                    if let Err(e) = release_with_timeout(control, &rule, timeout).await {
                        tracing::warn!(%rule, "Failed to release forward: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!(rule = %self.rule, "Exposure dropped outside a runtime, forward left in place");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(&'static str, ForwardingRule)>>,
        reject_expose: bool,
        stall_unexpose: bool,
    }

    impl Recorder {
        fn ops(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().iter().map(|(op, _)| *op).collect()
        }
    }

    #[async_trait]
    impl PortControl for Recorder {
        async fn expose(&self, rule: &ForwardingRule) -> PortliteResult<()> {
            self.calls.lock().unwrap().push(("expose", rule.clone()));
            if self.reject_expose {
                return Err(PortliteError::Expose {
                    rule: rule.to_string(),
                    reason: "rejected".into(),
                });
            }
            Ok(())
        }

        async fn unexpose(&self, rule: &ForwardingRule) -> PortliteResult<()> {
            self.calls.lock().unwrap().push(("unexpose", rule.clone()));
            if self.stall_unexpose {
                futures::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn rule() -> ForwardingRule {
        ForwardingRule::unix("/var/run/a.sock", "/run/b.sock")
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_acquire_failure_holds_nothing() {
        let recorder = Arc::new(Recorder {
            reject_expose: true,
            ..Default::default()
        });

        let result = Exposure::acquire(recorder.clone(), rule(), TIMEOUT).await;
        assert!(matches!(result, Err(PortliteError::Expose { .. })));
        assert_eq!(recorder.ops(), vec!["expose"]);
    }

    #[tokio::test]
    async fn test_hold_releases_after_ok_body() {
        let recorder = Arc::new(Recorder::default());
        let exposure = Exposure::acquire(recorder.clone(), rule(), TIMEOUT).await.unwrap();

        let value = exposure.hold(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(recorder.ops(), vec!["expose", "unexpose"]);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test]
    async fn test_hold_releases_after_err_body() {
        let recorder = Arc::new(Recorder::default());
        let exposure = Exposure::acquire(recorder.clone(), rule(), TIMEOUT).await.unwrap();

        let result: PortliteResult<()> = exposure
            .hold(async { Err(PortliteError::Protocol("boom".into())) })
            .await;
        assert!(matches!(result, Err(PortliteError::Protocol(_))));
        assert_eq!(recorder.ops(), vec!["expose", "unexpose"]);
    }

    #[tokio::test]
    async fn test_hold_releases_after_panic() {
        let recorder = Arc::new(Recorder::default());
        let exposure = Exposure::acquire(recorder.clone(), rule(), TIMEOUT).await.unwrap();

        let held = AssertUnwindSafe(exposure.hold::<_, ()>(async { panic!("body panicked") }))
            .catch_unwind()
            .await;
        assert!(held.is_err());
        assert_eq!(recorder.ops(), vec!["expose", "unexpose"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_times_out() {
        let recorder = Arc::new(Recorder {
            stall_unexpose: true,
            ..Default::default()
        });
        let exposure = Exposure::acquire(recorder.clone(), rule(), Duration::from_millis(50))
            .await
            .unwrap();

        let err = exposure.release().await.unwrap_err();
        match err {
            PortliteError::Unexpose { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_drop_schedules_release() {
        let recorder = Arc::new(Recorder::default());
        let exposure = Exposure::acquire(recorder.clone(), rule(), TIMEOUT).await.unwrap();

        drop(exposure);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.ops(), vec!["expose", "unexpose"]);
    }
}
