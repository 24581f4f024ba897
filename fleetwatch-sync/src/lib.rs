//! # fleetwatch-sync
//!
//! Snapshot reconciliation and config publishing.
//!
//! Build a [`Pipeline`] and call [`Pipeline::run`] with a freshly discovered host list to diff it
//! against the persisted snapshot and, when anything changed, republish the
//! monitoring configuration, restart the daemon and schedule downtime.

pub mod diff;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod snapshot_store;
pub mod writer;

pub use diff::reconcile;
pub use error::{StoreError, SyncError};
pub use notify::{
    error_message, host_change_message, LogNotifier, Notifier, NotifyError, CHANGE_SUBJECT,
    ERROR_SUBJECT,
};
pub use pipeline::{Pipeline, RunOutcome, RunStatus};
pub use snapshot_store::SnapshotStore;
pub use writer::{publish, WriteResult};
