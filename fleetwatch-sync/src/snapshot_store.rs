//! Snapshot store: the last reconciled host set, persisted in SQLite.
//!
//! # Layout
//!
//! ```text
//! schema_fields(position INTEGER PRIMARY KEY, name TEXT NOT NULL, is_identifier INTEGER NOT NULL)
//! hosts(<field> TEXT, …, PRIMARY KEY(<identifier>))
//! ```
//!
//! `schema_fields` records the field list the store was created with. Every
//! later open compares it structurally against the configured schema and
//! refuses to continue on any difference; there is no migration.
//!
//! Every mutation is its own autocommitted statement.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection, OptionalExtension};

use fleetwatch_core::{HostRecord, Schema};

use crate::error::StoreError;

const HOSTS_TABLE: &str = "hosts";
const SCHEMA_TABLE: &str = "schema_fields";

/// Handle on the persisted snapshot for one schema.
#[derive(Debug)]
pub struct SnapshotStore {
    conn: Connection,
    schema: Schema,
    path: PathBuf,
}

impl SnapshotStore {
    /// Open or create the store at `path` for `schema`.
    ///
    /// Returns `StoreError::SchemaMismatch` (naming both schemas) if the store
    /// was created with a different identifier or field set.
    pub fn open(path: &Path, schema: &Schema) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        if !path.exists() {
            tracing::warn!(
                "snapshot database {} does not exist, creating new one",
                path.display()
            );
        }
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_path_buf(), schema)
    }

    /// Open a throwaway in-memory store (for testing).
    pub fn open_in_memory(schema: &Schema) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"), schema)
    }

    fn init(conn: Connection, path: PathBuf, schema: &Schema) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            schema: schema.clone(),
            path,
        };
        match store.stored_schema()? {
            Some(stored) if stored.matches(schema) => {}
            Some(stored) => {
                return Err(StoreError::SchemaMismatch {
                    path: store.path.clone(),
                    stored,
                    requested: schema.clone(),
                });
            }
            None => {
                tracing::debug!("no snapshot tables found, creating for {schema}");
                store.create_tables()?;
            }
        }
        Ok(store)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Every persisted record, ordered by identifier.
    pub fn all(&self) -> Result<Vec<HostRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {HOSTS_TABLE} ORDER BY {}",
            self.column_list(),
            quote(self.schema.identifier())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| self.record_from_row(row))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The record stored under `id`, if any.
    pub fn get(&self, id: &str) -> Result<Option<HostRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {HOSTS_TABLE} WHERE {} = ?1",
            self.column_list(),
            quote(self.schema.identifier())
        );
        Ok(self
            .conn
            .query_row(&sql, [id], |row| self.record_from_row(row))
            .optional()?)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {HOSTS_TABLE}"), [], |r| {
                r.get(0)
            })?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn insert(&mut self, record: &HostRecord) -> Result<(), StoreError> {
        let placeholders = (1..=self.schema.fields().len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {HOSTS_TABLE} ({}) VALUES ({placeholders})",
            self.column_list()
        );
        tracing::debug!("adding host {:?} to snapshot", record.id(&self.schema));
        self.conn
            .execute(&sql, params_from_iter(self.values(record)))?;
        Ok(())
    }

    /// Overwrite every field of the record with the same identifier.
    pub fn update(&mut self, record: &HostRecord) -> Result<(), StoreError> {
        let fields = self.schema.fields();
        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", quote(f), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {HOSTS_TABLE} SET {assignments} WHERE {} = ?{}",
            quote(self.schema.identifier()),
            fields.len() + 1
        );
        let mut values = self.values(record);
        values.push(record.get(self.schema.identifier()));
        tracing::debug!("updating host {:?} in snapshot", record.id(&self.schema));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {HOSTS_TABLE} WHERE {} = ?1",
            quote(self.schema.identifier())
        );
        tracing::debug!("deleting host {id} from snapshot");
        self.conn.execute(&sql, [id])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn stored_schema(&self) -> Result<Option<Schema>, StoreError> {
        let tables: BTreeSet<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
            let names = stmt.query_map([], |r| r.get::<_, String>(0))?;
            names.collect::<Result<_, _>>()?
        };
        if !tables.contains(SCHEMA_TABLE) {
            if tables.contains(HOSTS_TABLE) {
                return Err(self.corrupt("hosts table present without schema descriptor"));
            }
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, is_identifier FROM {SCHEMA_TABLE} ORDER BY position"
        ))?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, bool>(1)?)))?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        let mut identifiers = rows.iter().filter(|(_, ident)| *ident).map(|(n, _)| n);
        let identifier = match (identifiers.next(), identifiers.next()) {
            (Some(id), None) => id.clone(),
            _ => return Err(self.corrupt("expected exactly one identifier field")),
        };
        let fields = rows.into_iter().map(|(name, _)| name).collect();
        Schema::new(identifier, fields)
            .map(Some)
            .map_err(|e| self.corrupt(&e.to_string()))
    }

    fn create_tables(&self) -> Result<(), StoreError> {
        let columns = self
            .schema
            .fields()
            .iter()
            .map(|f| format!("{} TEXT", quote(f)))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "CREATE TABLE {SCHEMA_TABLE} (position INTEGER PRIMARY KEY, \
                 name TEXT NOT NULL, is_identifier INTEGER NOT NULL)"
            ),
            [],
        )?;
        for (position, field) in self.schema.fields().iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {SCHEMA_TABLE} (position, name, is_identifier) VALUES (?1, ?2, ?3)"
                ),
                rusqlite::params![
                    position as i64,
                    field,
                    field == self.schema.identifier()
                ],
            )?;
        }
        tx.execute(
            &format!(
                "CREATE TABLE {HOSTS_TABLE} ({columns}, PRIMARY KEY ({}))",
                quote(self.schema.identifier())
            ),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn column_list(&self) -> String {
        self.schema
            .fields()
            .iter()
            .map(|f| quote(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn values<'r>(&self, record: &'r HostRecord) -> Vec<Option<&'r str>> {
        self.schema.fields().iter().map(|f| record.get(f)).collect()
    }

    fn record_from_row(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<HostRecord> {
        let mut record = HostRecord::new();
        for (i, field) in self.schema.fields().iter().enumerate() {
            if let Some(value) = row.get::<_, Option<String>>(i)? {
                record.insert(field.as_str(), value);
            }
        }
        Ok(record)
    }

    fn corrupt(&self, reason: &str) -> StoreError {
        StoreError::CorruptDescriptor {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Double-quote an SQL identifier.
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema(fields: &[&str]) -> Schema {
        Schema::new("host_name", fields.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn host(name: &str, alias: &str) -> HostRecord {
        [("host_name", name), ("alias", alias)].into_iter().collect()
    }

    #[test]
    fn created_empty_on_first_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("hosts.db");
        let store = SnapshotStore::open(&path, &schema(&["host_name", "alias"])).unwrap();
        assert!(path.exists());
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn insert_update_delete_persist_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hosts.db");
        let s = schema(&["host_name", "alias"]);
        {
            let mut store = SnapshotStore::open(&path, &s).unwrap();
            store.insert(&host("web-1", "web")).unwrap();
            store.insert(&host("web-2", "web")).unwrap();
            store.update(&host("web-1", "frontend")).unwrap();
            store.delete("web-2").unwrap();
        }
        let store = SnapshotStore::open(&path, &s).unwrap();
        assert_eq!(store.all().unwrap(), vec![host("web-1", "frontend")]);
        assert_eq!(store.get("web-2").unwrap(), None);
    }

    #[test]
    fn reopen_with_reordered_fields_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hosts.db");
        SnapshotStore::open(&path, &schema(&["host_name", "alias"])).unwrap();
        SnapshotStore::open(&path, &schema(&["alias", "host_name"])).unwrap();
    }

    #[test]
    fn added_field_is_schema_mismatch_naming_both() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hosts.db");
        {
            let mut store = SnapshotStore::open(&path, &schema(&["host_name", "alias"])).unwrap();
            store.insert(&host("web-1", "web")).unwrap();
        }

        let err = SnapshotStore::open(&path, &schema(&["host_name", "alias", "address"]))
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
        assert!(message.contains("[host_name, alias]"), "{message}");
        assert!(message.contains("[host_name, alias, address]"), "{message}");

        let store = SnapshotStore::open(&path, &schema(&["host_name", "alias"])).unwrap();
        assert_eq!(store.all().unwrap(), vec![host("web-1", "web")]);
    }

    #[test]
    fn primary_key_rejects_duplicate_insert() {
        let mut store = SnapshotStore::open_in_memory(&schema(&["host_name", "alias"])).unwrap();
        store.insert(&host("web-1", "web")).unwrap();
        assert!(store.insert(&host("web-1", "other")).is_err());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn values_with_quotes_are_stored_verbatim() {
        let mut store = SnapshotStore::open_in_memory(&schema(&["host_name", "alias"])).unwrap();
        let tricky = host("web\"1", "it's \"quoted\"; DROP TABLE hosts");
        store.insert(&tricky).unwrap();
        assert_eq!(store.get("web\"1").unwrap(), Some(tricky));
    }

    #[test]
    fn foreign_hosts_table_without_descriptor_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hosts.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE hosts (host_name TEXT PRIMARY KEY)", [])
                .unwrap();
        }
        let err = SnapshotStore::open(&path, &schema(&["host_name"])).unwrap_err();
        assert!(matches!(err, StoreError::CorruptDescriptor { .. }));
    }
}
