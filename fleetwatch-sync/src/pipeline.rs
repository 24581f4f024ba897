//! One reconciliation run, shared by `fleetwatch run` and the tests.
//!
//! ```text
//! reconcile → (no change: stop)
//!   → publish → verify → (fail: notify, stop)
//!   → restart → (fail: notify, stop)
//!   → downtime for added hosts → notify host change
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tracing::Span;

use fleetwatch_core::{ChangeSet, Config, HostId, HostRecord, MonitoringConfig, Schema, SplitBy};
use fleetwatch_daemon::{DowntimeScheduler, ServiceManager};

use crate::diff::reconcile;
use crate::error::SyncError;
use crate::notify::{
    deliver, error_message, host_change_message, Notifier, CHANGE_SUBJECT, ERROR_SUBJECT,
};
use crate::snapshot_store::SnapshotStore;
use crate::writer::{publish, WriteResult};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Discovery matched the snapshot; nothing was written.
    NoChanges,
    /// Files were published, the daemon restarted and downtime scheduled.
    Published {
        files: Vec<WriteResult>,
        downtime: Vec<HostId>,
    },
    /// The verify command rejected the generated configuration.
    VerifyFailed { files: Vec<WriteResult>, output: String },
    /// The restart command failed.
    RestartFailed { files: Vec<WriteResult> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub changes: ChangeSet,
    pub status: RunStatus,
}

impl RunOutcome {
    /// Whether the run ended in a reported (non-fatal) failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            RunStatus::VerifyFailed { .. } | RunStatus::RestartFailed { .. }
        )
    }
}

/// Everything a run needs besides the store and the discovered hosts.
pub struct Pipeline<'n> {
    schema: Schema,
    host_dir: PathBuf,
    split_by: SplitBy,
    service: ServiceManager,
    downtime: DowntimeScheduler,
    notifier: &'n dyn Notifier,
    hostname: String,
    span: Span,
}

impl<'n> Pipeline<'n> {
    pub fn new(
        schema: Schema,
        monitoring: &MonitoringConfig,
        notifier: &'n dyn Notifier,
        hostname: impl Into<String>,
    ) -> Self {
        let span = tracing::info_span!("run");
        let service = ServiceManager::new(&monitoring.test_config_cmd, &monitoring.restart_cmd)
            .with_span(tracing::info_span!(parent: &span, "service"));
        let downtime = DowntimeScheduler::new(
            &monitoring.command_file,
            monitoring.downtime_user.clone(),
        )
        .with_span(tracing::info_span!(parent: &span, "downtime"));

        Self {
            schema,
            host_dir: monitoring.host_dir.clone(),
            split_by: monitoring.split_by.clone(),
            service,
            downtime,
            notifier,
            hostname: hostname.into(),
            span,
        }
    }

    pub fn from_config(
        config: &Config,
        notifier: &'n dyn Notifier,
        hostname: impl Into<String>,
    ) -> Self {
        Self::new(config.schema.clone(), &config.monitoring, notifier, hostname)
    }

    /// Override the wait between restart and downtime submission.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.downtime = self.downtime.with_settle_delay(delay);
        self
    }

    /// Reconcile `discovered` into `store` and push any change to the daemon.
    ///
    /// Verify and restart failures are notified and reported through
    /// [`RunStatus`]; every other failure is returned as an error.
    pub fn run(
        &self,
        store: &mut SnapshotStore,
        discovered: &[HostRecord],
    ) -> Result<RunOutcome, SyncError> {
        let _enter = self.span.enter();
        if !self.host_dir.is_dir() {
            return Err(SyncError::MissingConfigDir {
                path: self.host_dir.clone(),
            });
        }

        let changes = reconcile(store, &self.schema, discovered)?;
        if changes.is_empty() {
            tracing::info!("no change to host list, nothing to do");
            return Ok(RunOutcome {
                changes,
                status: RunStatus::NoChanges,
            });
        }
        tracing::info!("host list changed ({} hosts), writing config", changes.len());

        let records = store.all()?;
        let files = publish(&self.host_dir, &self.schema, &records, &self.split_by)?;

        let verified = self.service.verify();
        if !verified.ok {
            tracing::error!("failed to verify monitoring config");
            let detail = format!("Failed to verify monitoring config\n{}", verified.output);
            self.notify_error(Some(&detail));
            return Ok(RunOutcome {
                changes,
                status: RunStatus::VerifyFailed {
                    files,
                    output: verified.output,
                },
            });
        }

        if !self.service.restart() {
            tracing::error!("failed to restart monitoring daemon");
            self.notify_error(Some("Failed to restart monitoring daemon"));
            return Ok(RunOutcome {
                changes,
                status: RunStatus::RestartFailed { files },
            });
        }
        tracing::debug!("monitoring daemon restarted");

        let downtime = match self.downtime.schedule(&changes) {
            Ok(scheduled) => scheduled,
            Err(e) => {
                self.notify_error(Some(&format!("Failed to schedule downtime\n{e}")));
                return Err(e.into());
            }
        };

        deliver(
            self.notifier,
            &host_change_message(&self.hostname, &changes),
            CHANGE_SUBJECT,
        );

        Ok(RunOutcome {
            changes,
            status: RunStatus::Published { files, downtime },
        })
    }

    fn notify_error(&self, detail: Option<&str>) {
        deliver(
            self.notifier,
            &error_message(&self.hostname, detail),
            ERROR_SUBJECT,
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
