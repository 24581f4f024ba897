//! Domain types for fleetwatch.
//!
//! Field names and values are plain text everywhere: the monitoring daemon
//! only understands text, and the snapshot store keeps every column as `TEXT`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The value of the identifier field of one host record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(pub String);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// HostRecord
// ---------------------------------------------------------------------------

/// One discovered instance as the monitoring daemon sees it: field → value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostRecord(BTreeMap<String, String>);

impl HostRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The identifier value under `schema`, if the record carries it.
    pub fn id(&self, schema: &Schema) -> Option<HostId> {
        self.get(schema.identifier()).map(HostId::from)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HostRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Identifier field plus the ordered list of every configured field.
///
/// Order is the configuration order and drives column and rendering order.
/// Drift detection ([`Schema::matches`]) ignores order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    identifier: String,
    fields: Vec<String>,
}

impl Schema {
    /// Build a schema, checking field names, uniqueness and that the
    /// identifier is one of the fields.
    pub fn new(identifier: impl Into<String>, fields: Vec<String>) -> Result<Self, ConfigError> {
        let identifier = identifier.into();
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !is_valid_field_name(field) {
                return Err(ConfigError::InvalidFieldName(field.clone()));
            }
            if !seen.insert(field.as_str()) {
                return Err(ConfigError::DuplicateField(field.clone()));
            }
        }
        if !seen.contains(identifier.as_str()) {
            return Err(ConfigError::UnknownIdentifier { identifier });
        }
        Ok(Self { identifier, fields })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Every field except the identifier, in schema order.
    pub fn value_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(String::as_str)
            .filter(move |f| *f != self.identifier)
    }

    /// Structural, order-independent comparison used for drift detection.
    pub fn matches(&self, other: &Schema) -> bool {
        self.identifier == other.identifier && self.field_set() == other.field_set()
    }

    fn field_set(&self) -> BTreeSet<&str> {
        self.fields.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "identifier {} with fields [{}]",
            self.identifier,
            self.fields.join(", ")
        )
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`: safe as an SQL column and a directive key.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// How a single identifier differs between discovery and the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    /// Names of the non-identifier fields whose values differ.
    Updated(BTreeSet<String>),
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::Updated(fields) => {
                write!(f, "updated")?;
                for field in fields {
                    write!(f, ":{field}")?;
                }
                Ok(())
            }
        }
    }
}

/// Identifier → change, ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeMap<HostId, ChangeKind>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: HostId, kind: ChangeKind) {
        self.0.insert(id, kind);
    }

    pub fn get(&self, id: &str) -> Option<&ChangeKind> {
        self.0.get(&HostId::from(id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HostId, &ChangeKind)> {
        self.0.iter()
    }

    pub fn added(&self) -> impl Iterator<Item = &HostId> {
        self.0
            .iter()
            .filter(|(_, k)| matches!(k, ChangeKind::Added))
            .map(|(id, _)| id)
    }

    pub fn removed(&self) -> impl Iterator<Item = &HostId> {
        self.0
            .iter()
            .filter(|(_, k)| matches!(k, ChangeKind::Removed))
            .map(|(id, _)| id)
    }

    pub fn updated(&self) -> impl Iterator<Item = (&HostId, &BTreeSet<String>)> {
        self.0.iter().filter_map(|(id, k)| match k {
            ChangeKind::Updated(fields) => Some((id, fields)),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn schema_requires_identifier_among_fields() {
        let err = Schema::new("host_name", fields(&["alias", "address"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownIdentifier { .. }));
    }

    #[test]
    fn schema_rejects_duplicate_fields() {
        let err = Schema::new("host_name", fields(&["host_name", "alias", "alias"])).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField(f) if f == "alias"));
    }

    #[test]
    fn schema_match_ignores_order() {
        let a = Schema::new("host_name", fields(&["host_name", "alias", "address"])).unwrap();
        let b = Schema::new("host_name", fields(&["address", "host_name", "alias"])).unwrap();
        assert!(a.matches(&b));
    }

    #[test]
    fn schema_match_detects_identifier_change() {
        let a = Schema::new("host_name", fields(&["host_name", "alias"])).unwrap();
        let b = Schema::new("alias", fields(&["host_name", "alias"])).unwrap();
        assert!(!a.matches(&b));
    }

    #[test]
    fn schema_display_names_fields() {
        let s = Schema::new("host_name", fields(&["host_name", "alias"])).unwrap();
        assert_eq!(s.to_string(), "identifier host_name with fields [host_name, alias]");
    }

    #[test]
    fn value_fields_skip_identifier() {
        let s = Schema::new("host_name", fields(&["alias", "host_name", "address"])).unwrap();
        assert_eq!(s.value_fields().collect::<Vec<_>>(), vec!["alias", "address"]);
    }

    #[test]
    fn field_name_validation() {
        assert!(is_valid_field_name("host_name"));
        assert!(is_valid_field_name("_x1"));
        assert!(!is_valid_field_name("1x"));
        assert!(!is_valid_field_name("host-name"));
        assert!(!is_valid_field_name(""));
    }

    #[test]
    fn change_kind_display() {
        let updated = ChangeKind::Updated(["region".to_string(), "alias".to_string()].into());
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::Removed.to_string(), "removed");
        assert_eq!(updated.to_string(), "updated:alias:region");
    }

    #[test]
    fn change_set_partitions_by_kind() {
        let mut set = ChangeSet::new();
        set.record(HostId::from("a"), ChangeKind::Added);
        set.record(HostId::from("b"), ChangeKind::Removed);
        set.record(
            HostId::from("c"),
            ChangeKind::Updated(["alias".to_string()].into()),
        );
        assert_eq!(set.added().count(), 1);
        assert_eq!(set.removed().count(), 1);
        assert_eq!(set.updated().count(), 1);
        assert_eq!(set.len(), 3);
    }
}
