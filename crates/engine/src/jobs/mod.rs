// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Registry (spec §4.G): a fixed-size worker pool runs typed job
//! handlers FIFO, journaling every transition to a single `jobs.json`
//! document (no write-ahead log — see `DESIGN.md` for why the teacher's
//! `Wal`/`Snapshot` machinery has no counterpart here).

pub mod handlers;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use oj_core::clock::Clock;
use oj_core::error::ErrorKind;
use oj_core::id::JobId;
use oj_core::job::Progress;
pub use oj_core::job::{Job, JobStatus};
use oj_storage::json_store;
use oj_storage::StoreError;

pub type HandlerRegistry = HashMap<&'static str, Arc<dyn JobHandler>>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Store(e) => e.kind(),
            JobError::NotFound(_) => ErrorKind::NotFound,
            JobError::Conflict(_) => ErrorKind::Conflict,
            JobError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// What a job handler sees: progress/message reporting, cancellation, and
/// the home directory it must sandbox its own path parameters against.
pub struct JobCtx {
    id: JobId,
    home: PathBuf,
    inner: Arc<Inner>,
    cancel_token: CancellationToken,
}

impl JobCtx {
    pub fn job_id(&self) -> &JobId {
        &self.id
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn report_progress(&self, completed: u64, total: u64, unit: Option<&str>) {
        self.inner.update(&self.id, |job| {
            job.progress = Some(Progress::new(completed, total.max(completed), unit));
        });
    }

    pub fn set_message(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.update(&self.id, |job| job.message = Some(text.clone()));
    }

    pub fn check_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

/// A typed job handler: `(ctx, params) -> result | error`. Registered by
/// type string in a `HandlerRegistry` built by `bootstrap_handlers` — no
/// reflection, matching spec §9's explicit-registry guidance.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, ctx: &JobCtx, params: Value) -> Result<Value, String>;
}

struct Inner {
    path: PathBuf,
    home: PathBuf,
    clock: Arc<dyn Clock>,
    jobs: Mutex<HashMap<JobId, Job>>,
    handlers: HandlerRegistry,
    queue_tx: mpsc::UnboundedSender<JobId>,
}

impl Inner {
    fn persist(&self) -> Result<(), JobError> {
        let jobs = self.jobs.lock();
        json_store::write(&self.path, &*jobs)?;
        Ok(())
    }

    fn update(&self, id: &JobId, mutate: impl FnOnce(&mut Job)) {
        let now = self.clock.epoch_secs();
        {
            let mut jobs = self.jobs.lock();
            if let Some(job) = jobs.get_mut(id) {
                mutate(job);
                job.updated_at = now;
            } else {
                return;
            }
        }
        let _ = self.persist();
    }

    fn finish(&self, id: &JobId, status: JobStatus, result: Option<Value>, error: Option<String>) {
        let now = self.clock.epoch_secs();
        self.update(id, |job| {
            job.status = status;
            job.result = result;
            job.error = error;
            job.ended_at = Some(now);
        });
    }
}

/// Registry of in-flight and historical jobs, backed by a fixed-size worker
/// pool (spec §4.G, §5).
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

impl JobRegistry {
    /// Load the journal, force any `pending`/`running` job to `failed`
    /// ("interrupted by restart" — jobs never resume, spec §9), then start
    /// `worker_count` workers gated by a semaphore so FIFO dispatch order is
    /// preserved while execution runs up to `worker_count` concurrently.
    pub fn open(
        path: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        handlers: HandlerRegistry,
        worker_count: usize,
    ) -> Result<Self, JobError> {
        let path = path.into();
        let mut jobs = json_store::read::<HashMap<JobId, Job>>(&path)?.unwrap_or_default();
        let now = clock.epoch_secs();
        for job in jobs.values_mut() {
            if matches!(job.status, JobStatus::Pending | JobStatus::Running) {
                job.status = JobStatus::Failed;
                job.error = Some("interrupted by restart".to_string());
                job.updated_at = now;
                job.ended_at = Some(now);
            }
        }
        json_store::write(&path, &jobs)?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            path,
            home: home.into(),
            clock,
            jobs: Mutex::new(jobs),
            handlers,
            queue_tx,
        });

        let semaphore = Arc::new(Semaphore::new(worker_count.max(1)));
        tokio::spawn(dispatch_loop(inner.clone(), queue_rx, semaphore));

        Ok(Self { inner })
    }

    pub fn submit(&self, kind: impl Into<String>, params: Value) -> Result<Job, JobError> {
        let kind = kind.into();
        if !self.inner.handlers.contains_key(kind.as_str()) {
            return Err(JobError::InvalidArgument(format!("unknown job type: {kind}")));
        }

        let id = JobId::generate();
        let now = self.inner.clock.epoch_secs();
        let job = Job::new(id.clone(), kind, params, now);

        {
            let mut jobs = self.inner.jobs.lock();
            jobs.insert(id.clone(), job.clone());
        }
        self.inner.persist()?;
        let _ = self.inner.queue_tx.send(id);
        Ok(job)
    }

    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<_> = self.inner.jobs.lock().values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    pub fn get(&self, id: &JobId) -> Result<Job, JobError> {
        self.inner
            .jobs
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Idempotent: a no-op returning the current job once it is terminal.
    pub fn cancel(&self, id: &JobId) -> Result<Job, JobError> {
        let job = self.get(id)?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        self.inner.update(id, |job| job.cancel_requested = true);
        self.get(id)
    }

    pub fn remove(&self, id: &JobId) -> Result<(), JobError> {
        let job = self.get(id)?;
        if !job.status.is_terminal() {
            return Err(JobError::Conflict(format!("job {id} is not terminal")));
        }
        self.inner.jobs.lock().remove(id);
        self.inner.persist()
    }
}

async fn dispatch_loop(inner: Arc<Inner>, mut queue_rx: mpsc::UnboundedReceiver<JobId>, semaphore: Arc<Semaphore>) {
    while let Some(id) = queue_rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let run_inner = inner.clone();
        let panic_inner = inner.clone();
        let panic_id = id.clone();
        let handle = tokio::spawn(run_job(run_inner, id));
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(join_err) = handle.await {
                if join_err.is_panic() {
                    panic_inner.finish(
                        &panic_id,
                        JobStatus::Failed,
                        None,
                        Some("job handler panicked".to_string()),
                    );
                }
            }
        });
    }
}

async fn run_job(inner: Arc<Inner>, id: JobId) {
    let prepared = {
        let mut jobs = inner.jobs.lock();
        let Some(job) = jobs.get_mut(&id) else { return };
        if job.cancel_requested {
            job.status = JobStatus::Cancelled;
            let now = inner.clock.epoch_secs();
            job.updated_at = now;
            job.ended_at = Some(now);
            None
        } else {
            let now = inner.clock.epoch_secs();
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            job.updated_at = now;
            let handler = inner.handlers.get(job.kind.as_str()).cloned();
            Some((handler, job.params.clone()))
        }
    };
    let _ = inner.persist();

    let Some((handler, params)) = prepared else {
        return;
    };

    let handler = match handler {
        Some(h) => h,
        None => {
            inner.finish(&id, JobStatus::Failed, None, Some("no handler registered".to_string()));
            return;
        }
    };

    let cancel_token = CancellationToken::new();
    let ctx = JobCtx {
        id: id.clone(),
        home: inner.home.clone(),
        inner: inner.clone(),
        cancel_token: cancel_token.clone(),
    };

    // Cooperative cancellation: `cancel()` flips `cancel_requested` on the
    // persisted job, this task fires the in-memory token the handler polls.
    tokio::spawn({
        let inner = inner.clone();
        let id = id.clone();
        let cancel_token = cancel_token.clone();
        async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                let cancelled = inner.jobs.lock().get(&id).map(|j| j.cancel_requested).unwrap_or(true);
                if cancelled {
                    cancel_token.cancel();
                    return;
                }
                if cancel_token.is_cancelled() {
                    return;
                }
            }
        }
    });

    let outcome = handler.run(&ctx, params).await;
    cancel_token.cancel();

    match outcome {
        Ok(result) => inner.finish(&id, JobStatus::Succeeded, Some(result), None),
        Err(message) => {
            let status = if ctx.check_cancelled() {
                JobStatus::Cancelled
            } else {
                JobStatus::Failed
            };
            let error = if status == JobStatus::Failed { Some(message) } else { None };
            inner.finish(&id, status, None, error);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
