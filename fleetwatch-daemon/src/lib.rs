//! Monitoring daemon control: config verification, restart, and downtime
//! directives for newly discovered hosts.

pub mod command;
pub mod downtime;
mod error;
pub mod privilege;
pub mod service;

pub use command::{run_command, CommandOutcome};
pub use downtime::{directive, DowntimeScheduler};
pub use error::DaemonError;
pub use privilege::PrivilegeGuard;
pub use service::ServiceManager;
