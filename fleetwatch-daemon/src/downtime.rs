//! Downtime directives for newly added hosts.
//!
//! # Directive format
//!
//! ```text
//! [<start>] SCHEDULE_HOST_SVC_DOWNTIME;<host>;<start>;<end>;0;0;900;fleetwatch;<comment>;
//! ```
//!
//! `end` is `start + 600` while the duration field is `900`. Both are fixed
//! constants and are not reconciled with each other.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::Span;

use fleetwatch_core::{ChangeSet, HostId};

use crate::error::{io_err, DaemonError};
use crate::privilege::PrivilegeGuard;

/// Wait after a restart before the daemon accepts external commands.
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);
/// Offset of the directive's end timestamp from its start.
pub const DOWNTIME_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Value of the directive's duration field.
pub const DOWNTIME_DURATION_SECS: u64 = 900;
pub const DOWNTIME_AUTHOR: &str = "fleetwatch";
pub const DOWNTIME_COMMENT: &str = "Newly discovered host settling in";

/// Build the directive line (without trailing newline) for `host`.
pub fn directive(host: &str, start: i64) -> String {
    let end = start + DOWNTIME_WINDOW.as_secs() as i64;
    format!(
        "[{start}] SCHEDULE_HOST_SVC_DOWNTIME;{host};{start};{end};0;0;{DOWNTIME_DURATION_SECS};{DOWNTIME_AUTHOR};{DOWNTIME_COMMENT}; "
    )
}

/// Writes one downtime directive per added host into the daemon's command
/// file.
#[derive(Debug, Clone)]
pub struct DowntimeScheduler {
    command_file: PathBuf,
    run_as: Option<String>,
    settle_delay: Duration,
    span: Span,
}

impl DowntimeScheduler {
    /// `run_as`: account the command file is written as, `None` keeps the
    /// current identity.
    pub fn new(command_file: impl Into<PathBuf>, run_as: Option<String>) -> Self {
        Self {
            command_file: command_file.into(),
            run_as,
            settle_delay: SETTLE_DELAY,
            span: tracing::info_span!("downtime"),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Schedule downtime for every `Added` entry of `changes`.
    ///
    /// Sleeps once for the settle delay when there is at least one added
    /// host. Stops at the first failed write; hosts before it keep their
    /// downtime. Returns the hosts that were scheduled.
    pub fn schedule(&self, changes: &ChangeSet) -> Result<Vec<HostId>, DaemonError> {
        let _enter = self.span.enter();
        let added: Vec<&HostId> = changes.added().collect();
        if added.is_empty() {
            tracing::debug!("no new hosts, no downtime to schedule");
            return Ok(vec![]);
        }

        tracing::debug!(
            "waiting {}s for the monitoring daemon to settle",
            self.settle_delay.as_secs()
        );
        std::thread::sleep(self.settle_delay);

        if self.run_as.is_none() {
            tracing::warn!(
                "writing downtime to {} as the current user; set monitoring.downtime_user to switch accounts",
                self.command_file.display()
            );
        }

        let mut scheduled = Vec::with_capacity(added.len());
        for host in added {
            let start = Utc::now().timestamp();
            self.submit(&directive(&host.0, start))?;
            tracing::info!("scheduled downtime for {host}");
            scheduled.push(host.clone());
        }
        Ok(scheduled)
    }

    /// Append `line` to the command file, as `run_as` when set.
    ///
    /// The command file is never created; it is the daemon's named pipe.
    fn submit(&self, line: &str) -> Result<(), DaemonError> {
        let _guard = self
            .run_as
            .as_deref()
            .map(PrivilegeGuard::acquire)
            .transpose()?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.command_file)
            .map_err(|e| io_err(&self.command_file, e))?;
        writeln!(file, "{line}").map_err(|e| io_err(&self.command_file, e))?;
        Ok(())
    }
}
