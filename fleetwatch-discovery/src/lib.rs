//! Fleet discovery for `fleetwatch-discovery`.
//!
//! `discover(inventory, mapping)` loads instance records from the configured
//! inventory source, drops excluded or filtered-out instances, and resolves
//! every mapped field into a [`HostRecord`]. An instance that cannot supply a
//! mapped attribute or tag aborts discovery.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use fleetwatch_core::mapping::SOURCE_SEPARATOR;
use fleetwatch_core::{FieldMapping, FieldSource, HostRecord, InventoryConfig, InventorySource};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One compute instance as reported by the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    /// Scalar instance properties (`id`, `private_ip_address`, …), as text.
    pub attributes: BTreeMap<String, String>,
    /// User-assigned tags.
    pub tags: BTreeMap<String, String>,
}

impl Instance {
    /// Human-readable label for error messages.
    pub fn label(&self) -> &str {
        self.attributes
            .get("id")
            .map(String::as_str)
            .unwrap_or("<unknown instance>")
    }

    fn lookup(&self, source: &FieldSource) -> Option<&str> {
        match source {
            FieldSource::Attribute(name) => self.attributes.get(name),
            FieldSource::Tag(key) => self.tags.get(key),
        }
        .map(String::as_str)
    }

    fn matches_filter(&self, key: &str, expected: &str) -> bool {
        let actual = match key.strip_prefix(fleetwatch_core::mapping::TAG_PREFIX) {
            Some(tag) => self.tags.get(tag),
            None => self.attributes.get(key),
        };
        actual.map(String::as_str) == Some(expected)
    }
}

/// Errors from discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("inventory command '{command}' could not be tokenized")]
    BadCommand { command: String },

    #[error("inventory command '{command}' failed to execute: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory command '{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unable to find {lookup} on instance {instance} when building host field {field}")]
    UnresolvedField {
        instance: String,
        field: String,
        lookup: String,
    },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load, filter and resolve the fleet into host records.
pub fn discover(
    inventory: &InventoryConfig,
    mapping: &FieldMapping,
) -> Result<Vec<HostRecord>, DiscoveryError> {
    let mut instances = load_instances(&inventory.source)?;
    if let Some(region) = inventory.region.as_deref() {
        for inst in &mut instances {
            inst.attributes
                .entry("region".to_string())
                .or_insert_with(|| region.to_string());
        }
    }
    let total = instances.len();
    let instances = apply_filters(
        instances,
        &inventory.filters,
        inventory.exclude_tag.as_deref(),
    );
    tracing::debug!("{} of {total} instances selected", instances.len());

    instances.iter().map(|inst| resolve(mapping, inst)).collect()
}

/// Read the raw instance list from a file or command.
pub fn load_instances(source: &InventorySource) -> Result<Vec<Instance>, DiscoveryError> {
    match source {
        InventorySource::File(path) => {
            let contents = std::fs::read_to_string(path).map_err(|e| DiscoveryError::Io {
                path: path.clone(),
                source: e,
            })?;
            parse_inventory(&contents, &path.display().to_string())
        }
        InventorySource::Command(command) => {
            let stdout = run_inventory_command(command)?;
            parse_inventory(&stdout, command)
        }
    }
}

/// Parse a JSON array of `{ "attributes": {…}, "tags": {…} }` objects.
///
/// Numbers and booleans are kept as their text form; `null` counts as absent.
pub fn parse_inventory(json: &str, origin: &str) -> Result<Vec<Instance>, DiscoveryError> {
    let raw: Vec<RawInstance> = serde_json::from_str(json).map_err(|e| DiscoveryError::Parse {
        origin: origin.to_string(),
        source: e,
    })?;
    Ok(raw.into_iter().map(Instance::from).collect())
}

/// Keep instances matching every filter and not carrying `exclude_tag`.
pub fn apply_filters(
    instances: Vec<Instance>,
    filters: &BTreeMap<String, String>,
    exclude_tag: Option<&str>,
) -> Vec<Instance> {
    instances
        .into_iter()
        .filter(|inst| exclude_tag.map_or(true, |tag| !inst.tags.contains_key(tag)))
        .filter(|inst| filters.iter().all(|(k, v)| inst.matches_filter(k, v)))
        .collect()
}

/// Build the host record for one instance. Multi-source fields are joined
/// with `-` in source order.
pub fn resolve(mapping: &FieldMapping, instance: &Instance) -> Result<HostRecord, DiscoveryError> {
    let mut record = HostRecord::new();
    for (field, sources) in mapping.iter() {
        let mut parts = Vec::with_capacity(sources.len());
        for source in sources {
            let value = instance
                .lookup(source)
                .ok_or_else(|| DiscoveryError::UnresolvedField {
                    instance: instance.label().to_string(),
                    field: field.to_string(),
                    lookup: describe(source),
                })?;
            parts.push(value);
        }
        record.insert(field, parts.join(SOURCE_SEPARATOR));
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawInstance {
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    tags: BTreeMap<String, Value>,
}

impl From<RawInstance> for Instance {
    fn from(raw: RawInstance) -> Self {
        Self {
            attributes: textify(raw.attributes),
            tags: textify(raw.tags),
        }
    }
}

fn textify(map: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect()
}

fn describe(source: &FieldSource) -> String {
    match source {
        FieldSource::Attribute(name) => format!("instance attribute {name}"),
        FieldSource::Tag(key) => format!("tag {key}"),
    }
}

fn run_inventory_command(command: &str) -> Result<String, DiscoveryError> {
    let argv = shlex::split(command)
        .filter(|argv| !argv.is_empty())
        .ok_or_else(|| DiscoveryError::BadCommand {
            command: command.to_string(),
        })?;
    tracing::debug!("loading inventory with: {command}");
    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .output()
        .map_err(|e| DiscoveryError::Spawn {
            command: command.to_string(),
            source: e,
        })?;
    if !output.status.success() {
        return Err(DiscoveryError::CommandFailed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
