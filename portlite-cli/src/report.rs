//! Success and failure reporting at the process boundary.

use std::io::Write;

use portlite::Reporter;
use portlite_shared::ForwardingRule;
use portlite_shared::constants::lifecycle::INTERACTIVE_OK;

/// Prints `OK` on stdout once the forward is live, for callers that wait on
/// the child's output before continuing.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveReporter;

impl Reporter for InteractiveReporter {
    fn exposed(&self, rule: &ForwardingRule) {
        tracing::debug!(%rule, "Reporting success");
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", INTERACTIVE_OK).and_then(|()| stdout.flush()) {
            tracing::warn!("Failed to write to stdout: {}", e);
        }
    }
}

/// Report a fatal error: on stderr in interactive mode, through the log
/// otherwise.
pub fn failure(interactive: bool, err: &anyhow::Error) {
    if interactive {
        eprintln!("{:#}", err);
    } else {
        tracing::error!("{:#}", err);
    }
}
