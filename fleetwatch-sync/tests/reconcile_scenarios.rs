use std::fs;
use std::path::Path;
use std::time::Duration;

use fleetwatch_core::{ChangeKind, HostRecord, MonitoringConfig, Schema, SplitBy};
use fleetwatch_sync::{
    reconcile, LogNotifier, Pipeline, RunStatus, SnapshotStore, StoreError, WriteResult,
};
use tempfile::TempDir;

fn schema(fields: &[&str]) -> Schema {
    Schema::new("host_name", fields.iter().map(|f| f.to_string()).collect()).expect("schema")
}

fn record(pairs: &[(&str, &str)]) -> HostRecord {
    pairs.iter().copied().collect()
}

fn monitoring(root: &Path, split_by: SplitBy) -> MonitoringConfig {
    let host_dir = root.join("objects");
    fs::create_dir_all(&host_dir).expect("host dir");
    let command_file = root.join("icinga.cmd");
    fs::write(&command_file, "").expect("command file");
    MonitoringConfig {
        host_dir,
        split_by,
        command_file,
        test_config_cmd: "true".into(),
        restart_cmd: "true".into(),
        downtime_user: None,
    }
}

#[test]
fn snapshot_survives_reopen_between_runs() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("state").join("hosts.db");
    let s = schema(&["host_name", "address"]);

    {
        let mut store = SnapshotStore::open(&db, &s).expect("open");
        store
            .insert(&record(&[("host_name", "host1"), ("address", "10.0.0.1")]))
            .expect("seed");
    }

    let mut store = SnapshotStore::open(&db, &s).expect("reopen");
    let batch = vec![
        record(&[("host_name", "host1"), ("address", "10.0.0.5")]),
        record(&[("host_name", "host2"), ("address", "10.0.0.2")]),
    ];
    let changes = reconcile(&mut store, &s, &batch).expect("reconcile");

    assert_eq!(changes.get("host2"), Some(&ChangeKind::Added));
    assert_eq!(
        changes.get("host1").map(ToString::to_string).as_deref(),
        Some("updated:address")
    );
    assert_eq!(store.all().expect("all"), batch);
}

#[test]
fn schema_drift_refuses_to_open_and_leaves_data() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("hosts.db");
    let old = schema(&["host_name", "alias"]);
    {
        let mut store = SnapshotStore::open(&db, &old).expect("open");
        store
            .insert(&record(&[("host_name", "web"), ("alias", "frontend")]))
            .expect("seed");
    }

    let err = SnapshotStore::open(&db, &schema(&["host_name", "alias", "address"]))
        .expect_err("drift must be rejected");
    match err {
        StoreError::SchemaMismatch {
            stored, requested, ..
        } => {
            assert!(stored.matches(&old));
            assert!(requested.contains("address"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let store = SnapshotStore::open(&db, &old).expect("original schema still opens");
    assert_eq!(store.len().expect("len"), 1);
}

#[test]
fn split_run_writes_one_file_per_region() {
    let tmp = TempDir::new().expect("tmp");
    let s = schema(&["host_name", "region"]);
    let monitoring = monitoring(tmp.path(), SplitBy::Field("region".into()));
    let notifier = LogNotifier;
    let pipeline =
        Pipeline::new(s.clone(), &monitoring, &notifier, "mon").with_settle_delay(Duration::ZERO);
    let mut store = SnapshotStore::open_in_memory(&s).expect("store");

    let batch = vec![
        record(&[("host_name", "a1"), ("region", "A")]),
        record(&[("host_name", "a2"), ("region", "A")]),
        record(&[("host_name", "b1"), ("region", "B")]),
    ];
    let outcome = pipeline.run(&mut store, &batch).expect("run");

    let RunStatus::Published { files, downtime } = outcome.status.clone() else {
        panic!("expected a published run, got {:?}", outcome.status);
    };
    assert_eq!(downtime.len(), 3);
    assert_eq!(
        files,
        vec![
            WriteResult::Written {
                path: monitoring.host_dir.join("fleetwatch_A.cfg"),
                hosts: 2
            },
            WriteResult::Written {
                path: monitoring.host_dir.join("fleetwatch_B.cfg"),
                hosts: 1
            },
        ]
    );

    let a = fs::read_to_string(monitoring.host_dir.join("fleetwatch_A.cfg")).expect("A");
    assert_eq!(a.matches("define host {").count(), 2);
    let directives = fs::read_to_string(&monitoring.command_file).expect("cmd");
    assert_eq!(directives.lines().count(), 3);

    let outcome = pipeline.run(&mut store, &batch[..2]).expect("second run");
    assert_eq!(outcome.changes.removed().count(), 1);
    assert!(!monitoring.host_dir.join("fleetwatch_B.cfg").exists());
}
