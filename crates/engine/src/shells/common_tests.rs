// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::shell::{RestartPolicy, ShellStatus};
use std::collections::HashMap;

fn sample(id: ShellId, created_at: u64) -> FrameworkShellRecord {
    FrameworkShellRecord {
        id,
        command: vec!["sleep".to_string(), "1".to_string()],
        cwd: PathBuf::from("/tmp"),
        env: HashMap::new(),
        label: String::new(),
        pid: Some(123),
        status: ShellStatus::Running,
        exit_code: None,
        created_at,
        updated_at: created_at,
        uses_pty: false,
        autostart: false,
        restart_policy: RestartPolicy::Never,
        run_id: "run_1".to_string(),
        cols: None,
        rows: None,
        spawn_error: None,
    }
}

#[test]
fn persist_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let record = sample(ShellId::generate(), 1);
    persist(dir.path(), &record).unwrap();
    let loaded = load(dir.path(), &record.id).unwrap().unwrap();
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.pid, record.pid);
}

#[test]
fn load_missing_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(dir.path(), &ShellId::generate()).unwrap().is_none());
}

#[test]
fn list_all_returns_every_persisted_record_sorted_by_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let a = sample(ShellId::generate(), 2);
    let b = sample(ShellId::generate(), 1);
    persist(dir.path(), &a).unwrap();
    persist(dir.path(), &b).unwrap();
    let listed = list_all(dir.path()).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, b.id);
}

#[test]
fn remove_files_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let record = sample(ShellId::generate(), 1);
    persist(dir.path(), &record).unwrap();
    remove_files(dir.path(), &record.id).unwrap();
    assert!(load(dir.path(), &record.id).unwrap().is_none());
    remove_files(dir.path(), &record.id).unwrap();
}
