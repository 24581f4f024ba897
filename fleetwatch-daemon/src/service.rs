//! Service manager: verify and restart the monitoring daemon.

use tracing::Span;

use crate::command::{run_command, CommandOutcome};

/// Runs the configured verify / restart commands.
#[derive(Debug, Clone)]
pub struct ServiceManager {
    verify_cmd: String,
    restart_cmd: String,
    span: Span,
}

impl ServiceManager {
    pub fn new(verify_cmd: impl Into<String>, restart_cmd: impl Into<String>) -> Self {
        Self {
            verify_cmd: verify_cmd.into(),
            restart_cmd: restart_cmd.into(),
            span: tracing::info_span!("service"),
        }
    }

    /// Log under `span` instead of the default `service` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Validate the generated configuration.
    pub fn verify(&self) -> CommandOutcome {
        let _enter = self.span.enter();
        tracing::debug!("verifying monitoring config, running: {}", self.verify_cmd);
        let outcome = run_command(&self.verify_cmd);
        if !outcome.ok {
            tracing::warn!("config verification failed");
        }
        outcome
    }

    /// Restart the daemon. Failure details are only logged.
    pub fn restart(&self) -> bool {
        let _enter = self.span.enter();
        tracing::debug!("restarting monitoring daemon with: {}", self.restart_cmd);
        let outcome = run_command(&self.restart_cmd);
        if !outcome.ok {
            tracing::error!("restart failed: {}", outcome.output);
        }
        outcome.ok
    }
}
