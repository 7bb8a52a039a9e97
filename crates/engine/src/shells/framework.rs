// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framework Shell Manager (spec §4.E): spawns, supervises, and reports on
//! headless background processes. One `parking_lot::Mutex<HashMap>` guards
//! the in-memory record set; each record has exactly one on-disk metadata
//! file and zero-or-one pair of log files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::Child;

use oj_adapters::stats::{read_stats, ShellStats};
use oj_core::clock::Clock;
use oj_core::error::ErrorKind;
use oj_core::id::ShellId;
use oj_core::sandbox;
use oj_core::shell::{FrameworkShellRecord, RestartPolicy, ShellAction, ShellStatus};
use oj_storage::log_store::{self, LogWriter};

use super::common::{self, ShellError};

const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const RESTART_BACKOFF_INITIAL_MS: u64 = 500;
const RESTART_BACKOFF_MAX_MS: u64 = 30_000;
const RESTART_HEALTHY_THRESHOLD_MS: u64 = 60_000;

/// Request body for `spawn` (spec §4.E, §6 `POST /framework_shells`).
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnFrameworkShell {
    pub command: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

struct RestartState {
    backoff_ms: u64,
    last_start_ms: u64,
}

struct Inner {
    base: PathBuf,
    home: PathBuf,
    run_id: String,
    max_shells: usize,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<ShellId, FrameworkShellRecord>>,
    restart_state: Mutex<HashMap<ShellId, RestartState>>,
    shutting_down: AtomicBool,
}

/// Spawns, supervises, and reports on headless background processes.
///
/// Cheap to clone: internally an `Arc`, so the supervisor tasks spawned by
/// `spawn`/`action("restart")` can hold their own handle back into the
/// registry.
#[derive(Clone)]
pub struct FrameworkShellManager {
    inner: Arc<Inner>,
}

impl FrameworkShellManager {
    pub fn new(
        base: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        run_id: impl Into<String>,
        max_shells: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                base: base.into(),
                home: home.into(),
                run_id: run_id.into(),
                max_shells,
                clock,
                records: Mutex::new(HashMap::new()),
                restart_state: Mutex::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Load persisted records from `${base}/meta` into the in-memory registry
    /// (called once at supervisor startup, before `sweep`).
    pub fn load_persisted(&self) -> Result<(), ShellError> {
        let mut records = self.inner.records.lock();
        for record in common::list_all(&self.inner.base)? {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    pub fn spawn(&self, request: SpawnFrameworkShell) -> Result<FrameworkShellRecord, ShellError> {
        if request.command.is_empty() {
            return Err(ShellError::InvalidArgument("command must be non-empty".into()));
        }

        let running = self
            .inner
            .records
            .lock()
            .values()
            .filter(|r| r.is_running())
            .count();
        if running >= self.inner.max_shells {
            return Err(ShellError::Conflict(format!(
                "framework shell cap reached ({}/{})",
                running, self.inner.max_shells
            )));
        }

        let cwd = sandbox::resolve_cwd(request.cwd.as_deref(), &self.inner.home)?;
        let id = ShellId::generate();
        let now = self.inner.clock.epoch_secs();

        let mut record = FrameworkShellRecord {
            id: id.clone(),
            command: request.command.clone(),
            cwd: cwd.clone(),
            env: request.env.clone(),
            label: request.label,
            pid: None,
            status: ShellStatus::Pending,
            exit_code: None,
            created_at: now,
            updated_at: now,
            uses_pty: false,
            autostart: request.autostart,
            restart_policy: request.restart_policy,
            run_id: self.inner.run_id.clone(),
            cols: None,
            rows: None,
            spawn_error: None,
        };

        match self.try_spawn_child(&record) {
            Ok(child) => {
                record.pid = child.id();
                record.status = ShellStatus::Running;
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record.clone());
                self.inner.restart_state.lock().insert(
                    id.clone(),
                    RestartState {
                        backoff_ms: RESTART_BACKOFF_INITIAL_MS,
                        last_start_ms: self.inner.clock.epoch_ms(),
                    },
                );
                tokio::spawn(supervise(self.inner.clone(), id, child));
                Ok(record)
            }
            Err(e) => {
                record.status = ShellStatus::Error;
                record.spawn_error = Some(e.to_string());
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id, record);
                Err(ShellError::Process(e))
            }
        }
    }

    fn try_spawn_child(
        &self,
        record: &FrameworkShellRecord,
    ) -> Result<Child, oj_adapters::ProcessError> {
        oj_adapters::process::spawn_detached(&record.command, &record.cwd, &record.env)
    }

    pub fn list(&self) -> Vec<FrameworkShellRecord> {
        let mut records: Vec<_> = self.inner.records.lock().values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn get(&self, id: &ShellId) -> Result<FrameworkShellRecord, ShellError> {
        self.inner
            .records
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ShellError::NotFound(id.clone()))
    }

    pub fn tail_logs(&self, id: &ShellId, n: usize) -> Result<(Vec<String>, Vec<String>), ShellError> {
        self.get(id)?;
        let stdout = log_store::tail_lines(&common::stdout_log_path(&self.inner.base, id), n)
            .map_err(|e| ShellError::Store(oj_storage::StoreError::Io {
                path: common::stdout_log_path(&self.inner.base, id),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            }))?;
        let stderr = log_store::tail_lines(&common::stderr_log_path(&self.inner.base, id), n)
            .map_err(|e| ShellError::Store(oj_storage::StoreError::Io {
                path: common::stderr_log_path(&self.inner.base, id),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            }))?;
        Ok((stdout, stderr))
    }

    pub fn stats(&self, id: &ShellId) -> Result<ShellStats, ShellError> {
        let record = self.get(id)?;
        let uptime = self.inner.clock.epoch_secs().saturating_sub(record.created_at);
        Ok(match record.pid {
            Some(pid) => read_stats(pid, uptime),
            None => ShellStats::Minimal {
                alive: false,
                uptime_secs: uptime,
            },
        })
    }

    pub async fn action(&self, id: &ShellId, action: ShellAction) -> Result<FrameworkShellRecord, ShellError> {
        let record = self.get(id)?;
        match action {
            ShellAction::Stop => {
                if record.is_running() {
                    self.stop_pid(&record).await?;
                }
                self.get(id)
            }
            ShellAction::Kill => {
                if let Some(pid) = record.pid {
                    if record.is_running() {
                        oj_adapters::process::send_signal(pid, Signal::SIGKILL)?;
                    }
                }
                self.get(id)
            }
            ShellAction::Restart => {
                if record.is_running() {
                    self.stop_pid(&record).await?;
                }
                self.respawn(id)
            }
        }
    }

    async fn stop_pid(&self, record: &FrameworkShellRecord) -> Result<(), ShellError> {
        let pid = match record.pid {
            Some(pid) => pid,
            None => return Ok(()),
        };
        oj_adapters::process::send_signal(pid, Signal::SIGTERM)?;
        let deadline = tokio::time::Instant::now() + STOP_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if !oj_adapters::process::is_alive(pid) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if oj_adapters::process::is_alive(pid) {
            oj_adapters::process::send_signal(pid, Signal::SIGKILL)?;
        }
        Ok(())
    }

    fn respawn(&self, id: &ShellId) -> Result<FrameworkShellRecord, ShellError> {
        let mut record = self.get(id)?;
        match self.try_spawn_child(&record) {
            Ok(child) => {
                record.pid = child.id();
                record.status = ShellStatus::Running;
                record.exit_code = None;
                record.spawn_error = None;
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record.clone());
                self.inner.restart_state.lock().insert(
                    id.clone(),
                    RestartState {
                        backoff_ms: RESTART_BACKOFF_INITIAL_MS,
                        last_start_ms: self.inner.clock.epoch_ms(),
                    },
                );
                tokio::spawn(supervise(self.inner.clone(), id.clone(), child));
                Ok(record)
            }
            Err(e) => {
                record.status = ShellStatus::Error;
                record.spawn_error = Some(e.to_string());
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record);
                Err(ShellError::Process(e))
            }
        }
    }

    pub async fn remove(&self, id: &ShellId, force: bool) -> Result<(), ShellError> {
        let record = self.get(id)?;
        if record.is_running() {
            if !force {
                return Err(ShellError::Conflict(format!("shell {id} is still running")));
            }
            self.stop_pid(&record).await?;
        }
        common::remove_files(&self.inner.base, id)?;
        self.inner.records.lock().remove(id);
        self.inner.restart_state.lock().remove(id);
        Ok(())
    }

    /// Reconcile `status` for every record by probing PID liveness.
    pub fn sweep(&self) {
        let mut records = self.inner.records.lock();
        let now = self.inner.clock.epoch_secs();
        for record in records.values_mut() {
            if record.status == ShellStatus::Running {
                let alive = record.pid.map(oj_adapters::process::is_alive).unwrap_or(false);
                if !alive {
                    record.status = ShellStatus::Exited;
                    record.updated_at = now;
                    let _ = common::persist(&self.inner.base, record);
                }
            }
        }
    }

    /// Stop-then-remove every record owned by the current run (spec §4.H
    /// shutdown cascade calls this first, with SIGTERM escalating to
    /// SIGKILL).
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        let ids: Vec<ShellId> = self
            .inner
            .records
            .lock()
            .values()
            .filter(|r| r.run_id == self.inner.run_id)
            .map(|r| r.id.clone())
            .collect();
        for id in ids {
            let _ = self.remove(&id, true).await;
        }
    }

    pub fn kind_for(&self, err: &ShellError) -> ErrorKind {
        err.kind()
    }
}

/// Copy a child's stdout/stderr into the log tail buffer, then wait for exit
/// and apply the restart policy (spec §4.E algorithms, §5 concurrency: one
/// task per stream plus a supervisor task per restart-enabled record).
async fn supervise(inner: Arc<Inner>, id: ShellId, mut child: Child) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let base = inner.base.clone();
    let stdout_id = id.clone();
    let stderr_id = id.clone();

    let stdout_task = tokio::spawn(copy_stream(stdout, common::stdout_log_path(&base, &stdout_id)));
    let stderr_task = tokio::spawn(copy_stream(stderr, common::stderr_log_path(&base, &stderr_id)));

    let exit_status = child.wait().await;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = match &exit_status {
        Ok(status) => common::encode_exit_status(*status),
        Err(_) => -1,
    };

    let now = inner.clock.epoch_secs();
    let record = {
        let mut records = inner.records.lock();
        match records.get_mut(&id) {
            Some(record) => {
                record.status = ShellStatus::Exited;
                record.exit_code = Some(exit_code);
                record.pid = None;
                record.updated_at = now;
                Some(record.clone())
            }
            None => None,
        }
    };
    let Some(record) = record else { return };
    let _ = common::persist(&inner.base, &record);

    if inner.shutting_down.load(Ordering::SeqCst) {
        return;
    }

    let should_restart = match record.restart_policy {
        RestartPolicy::Never => false,
        RestartPolicy::Always => true,
        RestartPolicy::OnFailure => exit_code != 0,
    };
    if !should_restart {
        return;
    }

    let backoff_ms = {
        let mut states = inner.restart_state.lock();
        let state = states.entry(id.clone()).or_insert(RestartState {
            backoff_ms: RESTART_BACKOFF_INITIAL_MS,
            last_start_ms: inner.clock.epoch_ms(),
        });
        let uptime_ms = inner.clock.epoch_ms().saturating_sub(state.last_start_ms);
        if uptime_ms >= RESTART_HEALTHY_THRESHOLD_MS {
            state.backoff_ms = RESTART_BACKOFF_INITIAL_MS;
        }
        let delay = state.backoff_ms;
        state.backoff_ms = (state.backoff_ms * 2).min(RESTART_BACKOFF_MAX_MS);
        delay
    };

    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    if inner.shutting_down.load(Ordering::SeqCst) {
        return;
    }

    let mut record = record;
    match oj_adapters::process::spawn_detached(&record.command, &record.cwd, &record.env) {
        Ok(child) => {
            record.pid = child.id();
            record.status = ShellStatus::Running;
            record.exit_code = None;
            record.updated_at = inner.clock.epoch_secs();
            if let Some(state) = inner.restart_state.lock().get_mut(&id) {
                state.last_start_ms = inner.clock.epoch_ms();
            }
            let _ = common::persist(&inner.base, &record);
            inner.records.lock().insert(id.clone(), record.clone());
            Box::pin(supervise(inner, id, child)).await;
        }
        Err(e) => {
            record.status = ShellStatus::Error;
            record.spawn_error = Some(e.to_string());
            record.updated_at = inner.clock.epoch_secs();
            let _ = common::persist(&inner.base, &record);
            inner.records.lock().insert(id, record);
        }
    }
}

async fn copy_stream(stream: Option<impl tokio::io::AsyncRead + Unpin>, path: PathBuf) {
    let Some(mut stream) = stream else { return };
    let mut writer = match LogWriter::open(&path) {
        Ok(writer) => writer,
        Err(_) => return,
    };
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if writer.append(&buf[..n]).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "framework_tests.rs"]
mod tests;
