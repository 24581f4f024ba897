//! Diff engine: reconcile a discovered host batch against the snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use fleetwatch_core::{ChangeKind, ChangeSet, HostId, HostRecord, Schema};

use crate::error::SyncError;
use crate::snapshot_store::SnapshotStore;

/// Classify every host as added, removed or updated and apply each change
/// to `store` as it is found.
///
/// Every record is shape-checked before the first mutation. Within the batch
/// the last record for an identifier wins. Mutations commit one by one, so a
/// store fault part way through leaves earlier changes applied.
pub fn reconcile(
    store: &mut SnapshotStore,
    schema: &Schema,
    discovered: &[HostRecord],
) -> Result<ChangeSet, SyncError> {
    for record in discovered {
        check_shape(schema, record)?;
    }
    let latest = collapse_duplicates(schema, discovered);

    let mut current: HashMap<HostId, HostRecord> = store
        .all()?
        .into_iter()
        .filter_map(|record| record.id(schema).map(|id| (id, record)))
        .collect();

    let mut changes = ChangeSet::new();
    for (id, record) in latest {
        match current.remove(&id) {
            None => {
                store.insert(record)?;
                changes.record(id, ChangeKind::Added);
            }
            Some(existing) => {
                let changed = changed_fields(schema, &existing, record);
                if !changed.is_empty() {
                    store.update(record)?;
                    changes.record(id, ChangeKind::Updated(changed));
                }
            }
        }
    }

    let mut gone: Vec<HostId> = current.into_keys().collect();
    gone.sort();
    for id in gone {
        store.delete(&id.0)?;
        changes.record(id, ChangeKind::Removed);
    }

    for (id, kind) in changes.iter() {
        tracing::debug!("{id}: {kind}");
    }
    Ok(changes)
}

/// Non-identifier fields whose values differ between `old` and `new`.
pub fn changed_fields(schema: &Schema, old: &HostRecord, new: &HostRecord) -> BTreeSet<String> {
    schema
        .value_fields()
        .filter(|field| old.get(field) != new.get(field))
        .map(str::to_string)
        .collect()
}

fn check_shape(schema: &Schema, record: &HostRecord) -> Result<(), SyncError> {
    let exact = record.len() == schema.fields().len()
        && schema.fields().iter().all(|f| record.contains(f));
    if exact {
        return Ok(());
    }
    Err(SyncError::RecordShape {
        host: record
            .get(schema.identifier())
            .unwrap_or("<no identifier>")
            .to_string(),
        found: record.fields().collect::<Vec<_>>().join(", "),
        expected: schema.fields().join(", "),
    })
}

fn collapse_duplicates<'a>(
    schema: &Schema,
    discovered: &'a [HostRecord],
) -> BTreeMap<HostId, &'a HostRecord> {
    let mut latest = BTreeMap::new();
    for record in discovered {
        let Some(id) = record.id(schema) else {
            continue;
        };
        if latest.insert(id.clone(), record).is_some() {
            tracing::warn!("host {id} discovered more than once, keeping the last record");
        }
    }
    latest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
