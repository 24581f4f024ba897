//! Effective-identity restoration. These tests switch the effective uid of
//! the whole process, so they only run as root and never concurrently.

use std::sync::Mutex;
use std::time::Duration;

use fleetwatch_core::{ChangeKind, ChangeSet, HostId};
use fleetwatch_daemon::{DaemonError, DowntimeScheduler, PrivilegeGuard};
use nix::unistd::{getegid, geteuid, User};
use tempfile::TempDir;

const ACCOUNT: &str = "nobody";

static SWITCH: Mutex<()> = Mutex::new(());

/// `None` when not root or the unprivileged account does not exist.
fn unprivileged_account() -> Option<User> {
    if !geteuid().is_root() {
        return None;
    }
    User::from_name(ACCOUNT).expect("passwd lookup")
}

#[test]
fn guard_switches_then_restores_on_drop() {
    let Some(target) = unprivileged_account() else {
        return;
    };
    let _serial = SWITCH.lock().unwrap_or_else(|e| e.into_inner());
    let before = (geteuid(), getegid());

    let guard = PrivilegeGuard::acquire(ACCOUNT).expect("switch to unprivileged account");
    assert!(guard.switched());
    assert_eq!((geteuid(), getegid()), (target.uid, target.gid));

    drop(guard);
    assert_eq!((geteuid(), getegid()), before);
}

#[test]
fn failed_downtime_write_still_restores_identity() {
    if unprivileged_account().is_none() {
        return;
    }
    let _serial = SWITCH.lock().unwrap_or_else(|e| e.into_inner());
    let before = (geteuid(), getegid());

    let dir = TempDir::new().expect("tmp");
    let cmd = dir.path().join("nagios.cmd");
    let mut changes = ChangeSet::new();
    changes.record(HostId::from("web-01"), ChangeKind::Added);

    let err = DowntimeScheduler::new(&cmd, Some(ACCOUNT.to_string()))
        .with_settle_delay(Duration::ZERO)
        .schedule(&changes)
        .expect_err("command file is missing");

    assert!(matches!(err, DaemonError::Io { .. }));
    assert_eq!((geteuid(), getegid()), before);
    assert!(!cmd.exists());
}
