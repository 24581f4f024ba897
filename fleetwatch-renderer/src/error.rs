//! Error types for fleetwatch-renderer.

use thiserror::Error;

/// All errors that can arise while partitioning or rendering hosts.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A record has no value for the split field.
    #[error("host '{host}' has no value for split field '{field}'")]
    MissingSplitField { host: String, field: String },
}
