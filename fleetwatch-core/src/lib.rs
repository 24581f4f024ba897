//! fleetwatch core library: domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: host records, schemas and change sets
//! - [`mapping`]: the statically validated field → inventory source mapping
//! - [`config`]: YAML configuration load + validation
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod mapping;
pub mod types;

pub use config::{
    Config, DatabaseConfig, InventoryConfig, InventorySource, MonitoringConfig,
    NotificationConfig, SplitBy, WebhookConfig,
};
pub use error::ConfigError;
pub use mapping::{FieldMapping, FieldSource, KNOWN_ATTRIBUTES};
pub use types::{ChangeKind, ChangeSet, HostId, HostRecord, Schema};
