use std::path::PathBuf;

use thiserror::Error;

/// Error surface for daemon control and downtime submission.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such account '{0}' for downtime submission")]
    UnknownUser(String),

    #[error("failed to look up account '{user}': {source}")]
    UserLookup {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("failed to {action}: {source}")]
    Privilege {
        action: String,
        #[source]
        source: nix::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
