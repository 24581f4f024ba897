//! Partitioning engine: [`Renderer`] and [`Partition`].
//!
//! # File naming
//!
//! | Split        | Output file                     | Fragment appended            |
//! |--------------|---------------------------------|------------------------------|
//! | `none`       | `fleetwatch.cfg`                | `fleetwatch.cfg.static`      |
//! | field `f`    | `fleetwatch_<value of f>.cfg`   | `fleetwatch_<value>.cfg.static` |
//!
//! Any file matching `fleetwatch.cfg` or `fleetwatch_*.cfg` is considered
//! generated and may be deleted by the writer. Fragment files never match.

use std::collections::BTreeMap;

use fleetwatch_core::{HostRecord, Schema, SplitBy};

use crate::block::render_host;
use crate::error::RenderError;

pub const FILE_PREFIX: &str = "fleetwatch";
pub const FILE_EXTENSION: &str = ".cfg";
pub const FRAGMENT_SUFFIX: &str = ".static";

/// Records destined for one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    /// Split field value, `None` for the single implicit partition.
    pub key: Option<String>,
    pub file_name: String,
    /// Ordered by identifier.
    pub records: Vec<&'a HostRecord>,
}

/// Block renderer bound to one schema and split setting.
#[derive(Debug, Clone)]
pub struct Renderer {
    schema: Schema,
    split_by: SplitBy,
}

impl Renderer {
    pub fn new(schema: Schema, split_by: SplitBy) -> Self {
        Self { schema, split_by }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Group `records` into partitions ordered by output file name.
    ///
    /// Split values whose sanitized file names coincide are merged into one
    /// partition, so no output file is ever written twice.
    ///
    /// With splitting disabled there is always exactly one partition, even
    /// for an empty record set.
    pub fn partition<'a>(&self, records: &'a [HostRecord]) -> Result<Vec<Partition<'a>>, RenderError> {
        let mut sorted: Vec<&HostRecord> = records.iter().collect();
        let ident = self.schema.identifier();
        sorted.sort_by(|a, b| a.get(ident).cmp(&b.get(ident)));

        let field = match &self.split_by {
            SplitBy::None => {
                return Ok(vec![Partition {
                    key: None,
                    file_name: file_name_for(None),
                    records: sorted,
                }]);
            }
            SplitBy::Field(field) => field,
        };

        // Keyed by file name: values that sanitize to the same name share a
        // partition, which keeps the smallest raw value as its key.
        let mut groups: BTreeMap<String, (String, Vec<&HostRecord>)> = BTreeMap::new();
        for record in sorted {
            let value = record
                .get(field)
                .ok_or_else(|| RenderError::MissingSplitField {
                    host: record.get(ident).unwrap_or_default().to_string(),
                    field: field.clone(),
                })?;
            let (key, members) = groups
                .entry(file_name_for(Some(value)))
                .or_insert_with(|| (value.to_string(), Vec::new()));
            if value < key.as_str() {
                *key = value.to_string();
            }
            members.push(record);
        }

        Ok(groups
            .into_iter()
            .map(|(file_name, (key, records))| Partition {
                key: Some(key),
                file_name,
                records,
            })
            .collect())
    }

    /// Render every block of a partition, in order.
    pub fn render(&self, partition: &Partition<'_>) -> String {
        partition
            .records
            .iter()
            .map(|record| render_host(&self.schema, record))
            .collect()
    }
}

/// Output file name for a split value.
///
/// Characters outside `[A-Za-z0-9._-]` become `_` so a value can never
/// escape the target directory.
pub fn file_name_for(key: Option<&str>) -> String {
    match key {
        None => format!("{FILE_PREFIX}{FILE_EXTENSION}"),
        Some(key) => {
            let safe: String = key
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("{FILE_PREFIX}_{safe}{FILE_EXTENSION}")
        }
    }
}

/// Whether `name` follows the generated-file naming convention.
pub fn is_generated_file_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(FILE_EXTENSION) else {
        return false;
    };
    match stem.strip_prefix(FILE_PREFIX) {
        Some("") => true,
        Some(rest) => rest.starts_with('_'),
        None => false,
    }
}
