// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::clock::SystemClock;
use std::sync::Arc;

fn manager(dir: &std::path::Path) -> FrameworkShellManager {
    FrameworkShellManager::new(dir.join("fw"), dir.to_path_buf(), "run_test", 1, Arc::new(SystemClock))
}

#[tokio::test]
async fn spawn_then_stop_transitions_to_exited() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let record = mgr
        .spawn(SpawnFrameworkShell {
            command: vec!["sleep".to_string(), "60".to_string()],
            cwd: None,
            env: HashMap::new(),
            label: "t1".to_string(),
            autostart: false,
            restart_policy: RestartPolicy::Never,
        })
        .unwrap();
    assert_eq!(record.status, ShellStatus::Running);

    let stopped = mgr.action(&record.id, ShellAction::Stop).await.unwrap();
    assert_eq!(stopped.status, ShellStatus::Exited);
    assert_eq!(stopped.exit_code, Some(-15));
}

#[tokio::test]
async fn spawn_rejects_when_cap_reached() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let req = || SpawnFrameworkShell {
        command: vec!["sleep".to_string(), "5".to_string()],
        cwd: None,
        env: HashMap::new(),
        label: String::new(),
        autostart: false,
        restart_policy: RestartPolicy::Never,
    };
    mgr.spawn(req()).unwrap();
    let err = mgr.spawn(req()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn spawn_rejects_empty_command() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let err = mgr
        .spawn(SpawnFrameworkShell {
            command: vec![],
            cwd: None,
            env: HashMap::new(),
            label: String::new(),
            autostart: false,
            restart_policy: RestartPolicy::Never,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn remove_without_force_on_running_shell_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let record = mgr
        .spawn(SpawnFrameworkShell {
            command: vec!["sleep".to_string(), "60".to_string()],
            cwd: None,
            env: HashMap::new(),
            label: String::new(),
            autostart: false,
            restart_policy: RestartPolicy::Never,
        })
        .unwrap();
    let err = mgr.remove(&record.id, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    mgr.remove(&record.id, true).await.unwrap();
    assert!(matches!(mgr.get(&record.id), Err(ShellError::NotFound(_))));
}

#[tokio::test]
async fn sweep_marks_dead_pid_as_exited() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let record = mgr
        .spawn(SpawnFrameworkShell {
            command: vec!["true".to_string()],
            cwd: None,
            env: HashMap::new(),
            label: String::new(),
            autostart: false,
            restart_policy: RestartPolicy::Never,
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    mgr.sweep();
    let after = mgr.get(&record.id).unwrap();
    assert_eq!(after.status, ShellStatus::Exited);
}
