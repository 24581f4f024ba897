//! Field mapping: which inventory attribute or tag feeds each host field.
//!
//! Built once from configuration and validated up front, so a typo in an
//! attribute name fails at startup instead of on the first discovered instance.

use std::fmt;

use crate::error::ConfigError;

/// Attributes the inventory adapter exposes on every instance.
pub const KNOWN_ATTRIBUTES: &[&str] = &[
    "id",
    "region",
    "placement",
    "instance_type",
    "state",
    "image_id",
    "key_name",
    "vpc_id",
    "subnet_id",
    "private_ip_address",
    "ip_address",
    "private_dns_name",
    "public_dns_name",
    "launch_time",
    "architecture",
    "platform",
];

/// Prefix marking a tag lookup in a mapping source.
pub const TAG_PREFIX: &str = "tag:";

/// Joins the parts of a multi-source field.
pub const SOURCE_SEPARATOR: &str = "-";

/// One place a host field value is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Attribute(String),
    Tag(String),
}

impl FieldSource {
    /// Parse `tag:<key>` or a bare attribute name for `field`.
    pub fn parse(field: &str, raw: &str) -> Result<Self, ConfigError> {
        if let Some(key) = raw.strip_prefix(TAG_PREFIX) {
            if key.is_empty() {
                return Err(ConfigError::EmptyTagKey {
                    field: field.to_string(),
                });
            }
            return Ok(FieldSource::Tag(key.to_string()));
        }
        if !KNOWN_ATTRIBUTES.contains(&raw) {
            return Err(ConfigError::UnknownAttribute {
                field: field.to_string(),
                attribute: raw.to_string(),
            });
        }
        Ok(FieldSource::Attribute(raw.to_string()))
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Attribute(name) => write!(f, "{name}"),
            FieldSource::Tag(key) => write!(f, "{TAG_PREFIX}{key}"),
        }
    }
}

/// Ordered field → sources table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMapping {
    entries: Vec<(String, Vec<FieldSource>)>,
}

impl FieldMapping {
    /// Validate raw `(field, sources)` pairs in configuration order.
    pub fn new(raw: Vec<(String, Vec<String>)>) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(raw.len());
        for (field, sources) in raw {
            if sources.is_empty() {
                return Err(ConfigError::EmptySource { field });
            }
            let parsed = sources
                .iter()
                .map(|s| FieldSource::parse(&field, s))
                .collect::<Result<Vec<_>, _>>()?;
            entries.push((field, parsed));
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldSource])> {
        self.entries
            .iter()
            .map(|(field, sources)| (field.as_str(), sources.as_slice()))
    }

    /// Field names in configuration order.
    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|(field, _)| field.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
