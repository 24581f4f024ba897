//! YAML configuration.
//!
//! # File layout
//!
//! ```yaml
//! inventory:
//!   source: file                  # file | command
//!   path: ~/inventory.json
//!   filters: { "tag:env": prod }
//!   exclude_tag: fleetwatch-ignore
//! monitoring:
//!   host_dir: /etc/nagios/conf.d/fleet
//!   host_identifier: host_name
//!   separate_hosts_by: none
//!   command_file: /var/lib/nagios/rw/nagios.cmd
//!   test_config_cmd: "nagios -v /etc/nagios/nagios.cfg"
//!   restart_cmd: "systemctl restart nagios"
//! database:
//!   type: sqlite
//!   location: ~/.fleetwatch/hosts.db
//! mappings:
//!   - { field: host_name, source: ["tag:Name", "id"] }
//!   - { field: address, source: private_ip_address }
//! notifications:
//!   enabled: false
//! ```
//!
//! # API pattern
//!
//! Like the rest of the workspace, every loader has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used by tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ConfigError};
use crate::mapping::FieldMapping;
use crate::types::Schema;

/// File name of the default configuration, relative to the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".fleetwatch.yaml";

/// The only supported snapshot backend.
pub const SQLITE_BACKEND: &str = "sqlite";

/// `separate_hosts_by` value disabling partitioning.
pub const SPLIT_NONE: &str = "none";

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// A fully validated configuration: every path expanded, every cross-field
/// rule checked.
#[derive(Debug, Clone)]
pub struct Config {
    pub inventory: InventoryConfig,
    pub monitoring: MonitoringConfig,
    pub database: DatabaseConfig,
    pub mapping: FieldMapping,
    pub schema: Schema,
    pub notifications: NotificationConfig,
}

/// Where discovered instances come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    /// A JSON document on disk.
    File(PathBuf),
    /// A shell-style command printing the JSON document on stdout.
    Command(String),
}

#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub source: InventorySource,
    pub region: Option<String>,
    /// `tag:<key>` or attribute name → required value.
    pub filters: BTreeMap<String, String>,
    /// Instances carrying this tag are skipped.
    pub exclude_tag: Option<String>,
}

/// How generated host files are partitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitBy {
    None,
    Field(String),
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub host_dir: PathBuf,
    pub split_by: SplitBy,
    pub command_file: PathBuf,
    pub test_config_cmd: String,
    pub restart_cmd: String,
    /// Account the downtime directive is written as; `None` keeps the
    /// current identity.
    pub downtime_user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub location: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub webhook: Option<WebhookConfig>,
}

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ConfigFile {
    inventory: InventoryFile,
    monitoring: MonitoringFile,
    database: DatabaseFile,
    mappings: Vec<MappingFile>,
    #[serde(default)]
    notifications: NotificationsFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceKind {
    File,
    Command,
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    source: SourceKind,
    path: Option<String>,
    command: Option<String>,
    region: Option<String>,
    #[serde(default)]
    filters: BTreeMap<String, String>,
    exclude_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MonitoringFile {
    host_dir: String,
    host_identifier: String,
    #[serde(default = "default_split")]
    separate_hosts_by: String,
    command_file: String,
    test_config_cmd: String,
    restart_cmd: String,
    downtime_user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabaseFile {
    #[serde(rename = "type")]
    kind: String,
    location: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceList {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    field: String,
    source: SourceList,
}

#[derive(Debug, Deserialize)]
struct NotificationsFile {
    #[serde(default = "default_enabled")]
    enabled: bool,
    webhook: Option<WebhookConfig>,
}

impl Default for NotificationsFile {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            webhook: None,
        }
    }
}

fn default_split() -> String {
    SPLIT_NONE.to_string()
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.fleetwatch.yaml`: pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(DEFAULT_CONFIG_FILE)
}

/// `default_path_at` convenience wrapper.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    Ok(default_path_at(&home()?))
}

impl Config {
    /// Load and validate the configuration at `path`, expanding `~` against `home`.
    ///
    /// Returns `ConfigError::NotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(home: &Path, path: &Path) -> Result<Self, ConfigError> {
        let path = expand_home(&path.to_string_lossy(), home);
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        Self::from_yaml_at(home, &path, &contents)
    }

    /// `load_at` convenience wrapper.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_at(&home()?, path)
    }

    /// Validate YAML `contents`; `path` is only used for error context.
    pub fn from_yaml_at(home: &Path, path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        validate(file, home)
    }
}

fn validate(file: ConfigFile, home: &Path) -> Result<Config, ConfigError> {
    if !file.database.kind.eq_ignore_ascii_case(SQLITE_BACKEND) {
        return Err(ConfigError::UnsupportedBackend(file.database.kind));
    }

    let mapping = FieldMapping::new(
        file.mappings
            .into_iter()
            .map(|m| {
                let sources = match m.source {
                    SourceList::One(s) => vec![s],
                    SourceList::Many(v) => v,
                };
                (m.field, sources)
            })
            .collect(),
    )?;
    let schema = Schema::new(file.monitoring.host_identifier, mapping.field_names())?;

    let split_by = if file.monitoring.separate_hosts_by.eq_ignore_ascii_case(SPLIT_NONE) {
        SplitBy::None
    } else if schema.contains(&file.monitoring.separate_hosts_by) {
        SplitBy::Field(file.monitoring.separate_hosts_by)
    } else {
        return Err(ConfigError::UnknownSplitField {
            field: file.monitoring.separate_hosts_by,
        });
    };

    let source = match file.inventory.source {
        SourceKind::File => {
            let raw = file
                .inventory
                .path
                .ok_or(ConfigError::MissingInventorySetting {
                    source_kind: "file",
                    key: "path",
                })?;
            InventorySource::File(expand_home(&raw, home))
        }
        SourceKind::Command => {
            let command = file
                .inventory
                .command
                .filter(|c| !c.trim().is_empty())
                .ok_or(ConfigError::MissingInventorySetting {
                    source_kind: "command",
                    key: "command",
                })?;
            InventorySource::Command(command)
        }
    };

    Ok(Config {
        inventory: InventoryConfig {
            source,
            region: file.inventory.region,
            filters: file.inventory.filters,
            exclude_tag: file.inventory.exclude_tag.filter(|t| !t.is_empty()),
        },
        monitoring: MonitoringConfig {
            host_dir: expand_home(&file.monitoring.host_dir, home),
            split_by,
            command_file: expand_home(&file.monitoring.command_file, home),
            test_config_cmd: file.monitoring.test_config_cmd,
            restart_cmd: file.monitoring.restart_cmd,
            downtime_user: file.monitoring.downtime_user.filter(|u| !u.is_empty()),
        },
        database: DatabaseConfig {
            location: expand_home(&file.database.location, home),
        },
        mapping,
        schema,
        notifications: NotificationConfig {
            enabled: file.notifications.enabled,
            webhook: file.notifications.webhook,
        },
    })
}

/// Expand a leading `~` or `~/` against `home`.
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
inventory:
  source: file
  path: ~/inventory.json
monitoring:
  host_dir: ~/hosts
  host_identifier: host_name
  command_file: /var/lib/nagios/rw/nagios.cmd
  test_config_cmd: "nagios -v /etc/nagios/nagios.cfg"
  restart_cmd: "systemctl restart nagios"
database:
  type: sqlite
  location: ~/.fleetwatch/hosts.db
mappings:
  - field: host_name
    source: ["tag:Name", "id"]
  - field: address
    source: private_ip_address
"#;

    #[test]
    fn minimal_config_loads_with_defaults() {
        let home = TempDir::new().unwrap();
        let cfg = Config::from_yaml_at(home.path(), Path::new("cfg.yaml"), MINIMAL).unwrap();
        assert_eq!(cfg.monitoring.split_by, SplitBy::None);
        assert_eq!(cfg.monitoring.host_dir, home.path().join("hosts"));
        assert_eq!(
            cfg.inventory.source,
            InventorySource::File(home.path().join("inventory.json"))
        );
        assert_eq!(cfg.schema.identifier(), "host_name");
        assert_eq!(cfg.schema.fields(), ["host_name", "address"]);
        assert!(cfg.notifications.enabled);
        assert!(cfg.monitoring.downtime_user.is_none());
    }

    #[test]
    fn load_missing_file_returns_not_found() {
        let home = TempDir::new().unwrap();
        let err = Config::load_at(home.path(), Path::new("~/nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { path } if path == home.path().join("nope.yaml")));
    }

    #[test]
    fn load_from_disk() {
        let home = TempDir::new().unwrap();
        let path = default_path_at(home.path());
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = Config::load_at(home.path(), &path).unwrap();
        assert_eq!(cfg.mapping.len(), 2);
    }

    #[test]
    fn expand_home_variants() {
        let home = Path::new("/home/ops");
        assert_eq!(expand_home("~", home), PathBuf::from("/home/ops"));
        assert_eq!(expand_home("~/a/b", home), PathBuf::from("/home/ops/a/b"));
        assert_eq!(expand_home("/etc/x", home), PathBuf::from("/etc/x"));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let home = TempDir::new().unwrap();
        let err = Config::from_yaml_at(home.path(), Path::new("bad.yaml"), "inventory: [").unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }
}
