// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::jobs::{JobHandler, JobRegistry};
use oj_core::clock::SystemClock;
use oj_core::job::JobStatus;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn registry(dir: &std::path::Path, move_mode: bool) -> JobRegistry {
    let mut handlers: HashMap<&'static str, Arc<dyn JobHandler>> = HashMap::new();
    let (kind, handler): (&'static str, Arc<dyn JobHandler>) = if move_mode {
        ("bulk_move", Arc::new(BulkCopyHandler::mv()))
    } else {
        ("bulk_copy", Arc::new(BulkCopyHandler::copy()))
    };
    handlers.insert(kind, handler);
    JobRegistry::open(dir.join("jobs.json"), dir, Arc::new(SystemClock), handlers, 1).unwrap()
}

async fn wait_terminal(jobs: &JobRegistry, id: &oj_core::id::JobId) -> oj_core::job::Job {
    for _ in 0..200 {
        let job = jobs.get(id).unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never finished");
}

#[tokio::test]
async fn copy_duplicates_file_and_reports_success() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("source.txt"), b"hello world").unwrap();
    std::fs::create_dir(home.path().join("dest")).unwrap();

    let jobs = registry(home.path(), false);
    let job = jobs
        .submit("bulk_copy", json!({"sources": ["source.txt"], "destination": "dest"}))
        .unwrap();
    let finished = wait_terminal(&jobs, &job.id).await;

    assert_eq!(finished.status, JobStatus::Succeeded);
    assert!(home.path().join("source.txt").exists());
    let copied = home.path().join("dest").join("source.txt");
    assert_eq!(std::fs::read_to_string(copied).unwrap(), "hello world");

    let results = finished.result.unwrap();
    assert_eq!(results[0]["ok"], json!(true));
}

#[tokio::test]
async fn move_removes_source_after_relocating() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("source.txt"), b"payload").unwrap();
    std::fs::create_dir(home.path().join("dest")).unwrap();

    let jobs = registry(home.path(), true);
    let job = jobs
        .submit("bulk_move", json!({"sources": ["source.txt"], "destination": "dest"}))
        .unwrap();
    let finished = wait_terminal(&jobs, &job.id).await;

    assert_eq!(finished.status, JobStatus::Succeeded);
    assert!(!home.path().join("source.txt").exists());
    assert!(home.path().join("dest").join("source.txt").exists());
}

#[tokio::test]
async fn empty_sources_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let jobs = registry(home.path(), false);
    let job = jobs
        .submit("bulk_copy", json!({"sources": [], "destination": "."}))
        .unwrap();
    let finished = wait_terminal(&jobs, &job.id).await;
    assert_eq!(finished.status, JobStatus::Failed);
    assert!(finished.error.unwrap_or_default().contains("non-empty"));
}

#[tokio::test]
async fn missing_source_is_reported_per_item_without_failing_the_job() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir(home.path().join("dest")).unwrap();
    let jobs = registry(home.path(), false);
    let job = jobs
        .submit(
            "bulk_copy",
            json!({"sources": ["does-not-exist.txt"], "destination": "dest"}),
        )
        .unwrap();
    let finished = wait_terminal(&jobs, &job.id).await;
    assert_eq!(finished.status, JobStatus::Succeeded);
    let results = finished.result.unwrap();
    assert_eq!(results[0]["ok"], json!(false));
}
