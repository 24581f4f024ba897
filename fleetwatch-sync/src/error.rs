//! Error types for fleetwatch-sync.

use std::path::PathBuf;

use thiserror::Error;

use fleetwatch_core::Schema;
use fleetwatch_daemon::DaemonError;
use fleetwatch_renderer::RenderError;

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from SQLite.
    #[error("snapshot database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store was created for a different field set.
    #[error(
        "fields in snapshot database {path} do not match the configuration; \
         stored: {stored}; configured: {requested}. \
         Delete the database if the configuration is correct"
    )]
    SchemaMismatch {
        path: PathBuf,
        stored: Schema,
        requested: Schema,
    },

    /// The stored schema descriptor cannot be read back as a schema.
    #[error("snapshot database {path} has an unreadable schema descriptor: {reason}")]
    CorruptDescriptor { path: PathBuf, reason: String },
}

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the snapshot store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error from the block renderer.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from daemon control (downtime submission).
    #[error("daemon error: {0}")]
    Daemon(#[from] DaemonError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured output directory is missing.
    #[error("monitoring configuration path {path} does not exist")]
    MissingConfigDir { path: PathBuf },

    /// A discovered record does not carry exactly the configured fields.
    #[error("host record {host} has fields [{found}], expected [{expected}]")]
    RecordShape {
        host: String,
        found: String,
        expected: String,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
