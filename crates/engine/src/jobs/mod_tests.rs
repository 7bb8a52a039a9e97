// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use oj_core::clock::SystemClock;
use serde_json::json;
use std::time::Duration;

struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    async fn run(&self, _ctx: &JobCtx, params: Value) -> Result<Value, String> {
        Ok(params)
    }
}

struct WaitForCancelHandler;

#[async_trait]
impl JobHandler for WaitForCancelHandler {
    async fn run(&self, ctx: &JobCtx, _params: Value) -> Result<Value, String> {
        ctx.cancel_token().cancelled().await;
        Err("cancelled".to_string())
    }
}

fn handlers() -> HandlerRegistry {
    let mut registry: HandlerRegistry = HashMap::new();
    registry.insert("echo", Arc::new(EchoHandler) as Arc<dyn JobHandler>);
    registry.insert("wait_for_cancel", Arc::new(WaitForCancelHandler) as Arc<dyn JobHandler>);
    registry
}

async fn wait_until_terminal(registry: &JobRegistry, id: &JobId) -> Job {
    for _ in 0..200 {
        let job = registry.get(id).unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never reached a terminal state");
}

async fn wait_until_running(registry: &JobRegistry, id: &JobId) {
    for _ in 0..200 {
        if registry.get(id).unwrap().status == JobStatus::Running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never started running");
}

#[tokio::test]
async fn submit_rejects_unknown_job_type() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::open(
        dir.path().join("jobs.json"),
        dir.path(),
        Arc::new(SystemClock),
        handlers(),
        2,
    )
    .unwrap();
    let err = registry.submit("does_not_exist", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn submitted_job_runs_and_succeeds_with_handler_result() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::open(
        dir.path().join("jobs.json"),
        dir.path(),
        Arc::new(SystemClock),
        handlers(),
        2,
    )
    .unwrap();
    let job = registry.submit("echo", json!({"hello": "world"})).unwrap();
    let finished = wait_until_terminal(&registry, &job.id).await;
    assert_eq!(finished.status, JobStatus::Succeeded);
    assert_eq!(finished.result, Some(json!({"hello": "world"})));
}

#[tokio::test]
async fn cancel_requests_propagate_to_the_running_handler() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::open(
        dir.path().join("jobs.json"),
        dir.path(),
        Arc::new(SystemClock),
        handlers(),
        2,
    )
    .unwrap();
    let job = registry.submit("wait_for_cancel", json!({})).unwrap();
    wait_until_running(&registry, &job.id).await;
    registry.cancel(&job.id).unwrap();
    let finished = wait_until_terminal(&registry, &job.id).await;
    assert_eq!(finished.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn cancel_on_terminal_job_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::open(
        dir.path().join("jobs.json"),
        dir.path(),
        Arc::new(SystemClock),
        handlers(),
        2,
    )
    .unwrap();
    let job = registry.submit("echo", json!({})).unwrap();
    wait_until_terminal(&registry, &job.id).await;
    let after = registry.cancel(&job.id).unwrap();
    assert_eq!(after.status, JobStatus::Succeeded);
}

#[tokio::test]
async fn remove_requires_terminal_status() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::open(
        dir.path().join("jobs.json"),
        dir.path(),
        Arc::new(SystemClock),
        handlers(),
        2,
    )
    .unwrap();
    let job = registry.submit("wait_for_cancel", json!({})).unwrap();
    wait_until_running(&registry, &job.id).await;
    let err = registry.remove(&job.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    registry.cancel(&job.id).unwrap();
    wait_until_terminal(&registry, &job.id).await;
    registry.remove(&job.id).unwrap();
    assert!(matches!(registry.get(&job.id), Err(JobError::NotFound(_))));
}

#[tokio::test]
async fn reopening_the_journal_fails_interrupted_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let clock = Arc::new(SystemClock);

    {
        let registry = JobRegistry::open(path.clone(), dir.path(), clock.clone(), handlers(), 2).unwrap();
        registry.submit("wait_for_cancel", json!({})).unwrap();
        wait_until_running(&registry, &registry.list()[0].id).await;
    }

    let reopened = JobRegistry::open(path, dir.path(), clock, handlers(), 2).unwrap();
    let jobs = reopened.list();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[0].error.as_deref(), Some("interrupted by restart"));
}
