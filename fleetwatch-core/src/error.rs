//! Error types for fleetwatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the configuration file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration file did not exist at the expected path.
    #[error("configuration file {path} doesn't exist")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`: cannot expand `~` paths.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A mapped field name is not usable as a column / directive key.
    #[error("invalid field name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidFieldName(String),

    /// The same field name is mapped twice.
    #[error("field '{0}' is mapped more than once")]
    DuplicateField(String),

    /// `host_identifier` does not name a mapped field.
    #[error("host_identifier '{identifier}' is not one of the mapped fields")]
    UnknownIdentifier { identifier: String },

    /// `separate_hosts_by` is neither `none` nor a mapped field.
    #[error("separate_hosts_by '{field}' is not set to a known host field")]
    UnknownSplitField { field: String },

    /// Only the SQLite snapshot backend exists.
    #[error("database type '{0}' is not supported; only sqlite is available")]
    UnsupportedBackend(String),

    /// A mapping declares no inventory source at all.
    #[error("field '{field}' has an empty source list")]
    EmptySource { field: String },

    /// A `tag:` source with nothing after the colon.
    #[error("field '{field}' uses an empty tag key")]
    EmptyTagKey { field: String },

    /// An attribute source the inventory adapter never produces.
    #[error("field '{field}' maps to unknown instance attribute '{attribute}'")]
    UnknownAttribute { field: String, attribute: String },

    /// The selected inventory source is missing its required setting.
    #[error("inventory source '{source_kind}' requires '{key}' to be set")]
    MissingInventorySetting {
        source_kind: &'static str,
        key: &'static str,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
