// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY Shell Manager (spec §4.F): extends the Framework Shell Manager's
//! lifecycle surface with a bidirectional PTY byte stream, fanned out to any
//! number of subscribers via bounded per-subscriber channels (drop-the-slow-
//! subscriber, never block the reader — spec §9 rejects a lossy `broadcast`
//! in favor of this explicit contract).

use std::collections::HashMap;
use std::io::{Read, Write as _};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use parking_lot::Mutex;
use portable_pty::PtySize;
use serde::Deserialize;
use tokio::sync::mpsc;

use oj_adapters::pty::PtyProcess;
use oj_core::clock::Clock;
use oj_core::id::ShellId;
use oj_core::sandbox;
use oj_core::shell::{FrameworkShellRecord, RestartPolicy, ShellAction, ShellStatus};
use oj_storage::log_store::LogWriter;

use super::common::{self, ShellError};

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;
const READ_CHUNK: usize = 4096;
/// Queue depth per subscriber; at the 4 KiB read chunk size this comfortably
/// covers the ≥ 64 KiB buffer the spec requires.
const SUBSCRIBER_CAPACITY: usize = 32;
const CMD_QUEUE_CAPACITY: usize = 32;
const WRITE_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Request body for `spawn_pty` (spec §4.F, §6 `POST /terminal/shells`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpawnPtyShell {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub cols: Option<u16>,
    #[serde(default)]
    pub rows: Option<u16>,
}

enum PtyCommand {
    Write(Vec<u8>),
    Resize(u16, u16),
}

/// Handle returned by `subscribe`, passed back to `unsubscribe` to identify
/// which fan-out sender to drop.
pub type SubscriberToken = u64;

struct Runtime {
    cmd_tx: mpsc::Sender<PtyCommand>,
    subscribers: Mutex<Vec<(SubscriberToken, mpsc::Sender<Vec<u8>>)>>,
    next_token: AtomicU64,
}

struct Inner {
    base: PathBuf,
    home: PathBuf,
    run_id: String,
    max_shells: usize,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<ShellId, FrameworkShellRecord>>,
    runtimes: Mutex<HashMap<ShellId, Arc<Runtime>>>,
    shutting_down: AtomicBool,
}

/// Owns PTY-backed shells: same record/state-machine surface as
/// `FrameworkShellManager`, plus subscribe/write/resize.
#[derive(Clone)]
pub struct PtyShellManager {
    inner: Arc<Inner>,
}

impl PtyShellManager {
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
                runtimes: Mutex::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn load_persisted(&self) -> Result<(), ShellError> {
        let mut records = self.inner.records.lock();
        for record in common::list_all(&self.inner.base)?.into_iter().filter(|r| r.uses_pty) {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    pub fn spawn(&self, request: SpawnPtyShell) -> Result<FrameworkShellRecord, ShellError> {
        let running = self
            .inner
            .records
            .lock()
            .values()
            .filter(|r| r.is_running())
            .count();
        if running >= self.inner.max_shells {
            return Err(ShellError::Conflict(format!(
                "pty shell cap reached ({}/{})",
                running, self.inner.max_shells
            )));
        }

        let cwd = sandbox::resolve_cwd(request.cwd.as_deref(), &self.inner.home)?;
        let cols = request.cols.unwrap_or(DEFAULT_COLS);
        let rows = request.rows.unwrap_or(DEFAULT_ROWS);
        let id = ShellId::generate();
        let now = self.inner.clock.epoch_secs();

        let mut record = FrameworkShellRecord {
            id: id.clone(),
            command: request.command.clone(),
            cwd: cwd.clone(),
            env: HashMap::new(),
            label: request.label,
            pid: None,
            status: ShellStatus::Pending,
            exit_code: None,
            created_at: now,
            updated_at: now,
            uses_pty: true,
            autostart: false,
            restart_policy: RestartPolicy::Never,
            run_id: self.inner.run_id.clone(),
            cols: Some(cols),
            rows: Some(rows),
            spawn_error: None,
        };

        match PtyProcess::spawn(&record.command, &cwd, &HashMap::new(), cols, rows) {
            Ok(process) => {
                record.pid = process.child.process_id();
                record.status = ShellStatus::Running;
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record.clone());

                let (cmd_tx, cmd_rx) = mpsc::channel(CMD_QUEUE_CAPACITY);
                let runtime = Arc::new(Runtime {
                    cmd_tx,
                    subscribers: Mutex::new(Vec::new()),
                    next_token: AtomicU64::new(0),
                });
                self.inner.runtimes.lock().insert(id.clone(), runtime);
                tokio::spawn(run_pty(self.inner.clone(), id, process, cmd_rx));
                Ok(record)
            }
            Err(e) => {
                record.status = ShellStatus::Error;
                record.spawn_error = Some(e.to_string());
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id, record);
                Err(ShellError::InvalidArgument(e.to_string()))
            }
        }
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

    pub fn tail_logs(&self, id: &ShellId, n: usize) -> Result<Vec<String>, ShellError> {
        self.get(id)?;
        oj_storage::log_store::tail_lines(&common::stdout_log_path(&self.inner.base, id), n).map_err(|e| {
            ShellError::Store(oj_storage::StoreError::Io {
                path: common::stdout_log_path(&self.inner.base, id),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })
        })
    }

    /// Subscribe to live output. No replay: callers wanting history read the
    /// persisted log tail first (`tail_logs`), then subscribe. Returns a
    /// token identifying this subscription for a later `unsubscribe`.
    pub fn subscribe(&self, id: &ShellId) -> Result<(SubscriberToken, mpsc::Receiver<Vec<u8>>), ShellError> {
        let runtimes = self.inner.runtimes.lock();
        let runtime = runtimes.get(id).ok_or_else(|| ShellError::NotFound(id.clone()))?;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let token = runtime.next_token.fetch_add(1, Ordering::SeqCst);
        runtime.subscribers.lock().push((token, tx));
        Ok((token, rx))
    }

    /// Drop a subscription established by `subscribe`. Idempotent: unknown
    /// tokens and shells with no live runtime (already exited or removed)
    /// are silently a no-op rather than an error.
    pub fn unsubscribe(&self, id: &ShellId, token: SubscriberToken) {
        if let Some(runtime) = self.inner.runtimes.lock().get(id).cloned() {
            runtime.subscribers.lock().retain(|(t, _)| *t != token);
        }
    }

    pub async fn write(&self, id: &ShellId, bytes: Vec<u8>) -> Result<(), ShellError> {
        let runtime = self
            .inner
            .runtimes
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ShellError::NotFound(id.clone()))?;
        match tokio::time::timeout(WRITE_ENQUEUE_TIMEOUT, runtime.cmd_tx.send(PtyCommand::Write(bytes))).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(ShellError::Busy(id.clone())),
        }
    }

    pub async fn resize(&self, id: &ShellId, cols: u16, rows: u16) -> Result<(), ShellError> {
        let runtime = self
            .inner
            .runtimes
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ShellError::NotFound(id.clone()))?;
        match tokio::time::timeout(WRITE_ENQUEUE_TIMEOUT, runtime.cmd_tx.send(PtyCommand::Resize(cols, rows))).await {
            Ok(Ok(())) => {
                let mut records = self.inner.records.lock();
                if let Some(record) = records.get_mut(id) {
                    record.cols = Some(cols);
                    record.rows = Some(rows);
                    record.updated_at = self.inner.clock.epoch_secs();
                    let _ = common::persist(&self.inner.base, record);
                }
                Ok(())
            }
            _ => Err(ShellError::Busy(id.clone())),
        }
    }

    pub async fn action(&self, id: &ShellId, action: ShellAction) -> Result<FrameworkShellRecord, ShellError> {
        let record = self.get(id)?;
        match action {
            ShellAction::Stop => {
                if record.is_running() {
                    self.stop_pid(&record, Signal::SIGHUP).await?;
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
                    self.stop_pid(&record, Signal::SIGHUP).await?;
                }
                self.respawn(id)
            }
        }
    }

    async fn stop_pid(&self, record: &FrameworkShellRecord, signal: Signal) -> Result<(), ShellError> {
        let pid = match record.pid {
            Some(pid) => pid,
            None => return Ok(()),
        };
        oj_adapters::process::send_signal(pid, signal)?;
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
        let cols = record.cols.unwrap_or(DEFAULT_COLS);
        let rows = record.rows.unwrap_or(DEFAULT_ROWS);
        match PtyProcess::spawn(&record.command, &record.cwd, &HashMap::new(), cols, rows) {
            Ok(process) => {
                record.pid = process.child.process_id();
                record.status = ShellStatus::Running;
                record.exit_code = None;
                record.spawn_error = None;
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record.clone());

                let (cmd_tx, cmd_rx) = mpsc::channel(CMD_QUEUE_CAPACITY);
                let runtime = Arc::new(Runtime {
                    cmd_tx,
                    subscribers: Mutex::new(Vec::new()),
                    next_token: AtomicU64::new(0),
                });
                self.inner.runtimes.lock().insert(id.clone(), runtime);
                tokio::spawn(run_pty(self.inner.clone(), id.clone(), process, cmd_rx));
                Ok(record)
            }
            Err(e) => {
                record.status = ShellStatus::Error;
                record.spawn_error = Some(e.to_string());
                record.updated_at = self.inner.clock.epoch_secs();
                common::persist(&self.inner.base, &record)?;
                self.inner.records.lock().insert(id.clone(), record);
                Err(ShellError::InvalidArgument(e.to_string()))
            }
        }
    }

    pub async fn remove(&self, id: &ShellId, force: bool) -> Result<(), ShellError> {
        let record = self.get(id)?;
        if record.is_running() {
            if !force {
                return Err(ShellError::Conflict(format!("shell {id} is still running")));
            }
            self.stop_pid(&record, Signal::SIGHUP).await?;
        }
        common::remove_files(&self.inner.base, id)?;
        self.inner.records.lock().remove(id);
        self.inner.runtimes.lock().remove(id);
        Ok(())
    }

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

    /// Stop (SIGHUP) then remove every PTY shell owned by the current run;
    /// the shutdown cascade runs this before the Framework Shell Manager's
    /// `shutdown()` (spec §4.H).
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
}

/// Drive one PTY for its lifetime: a blocking reader thread copies PTY
/// output into a channel; an async task drains that channel into the log
/// file and fans it out to subscribers (dropping any whose queue is full);
/// another async task serializes `write`/`resize` commands onto the PTY
/// master; a `spawn_blocking` task waits for the child to exit.
async fn run_pty(inner: Arc<Inner>, id: ShellId, process: PtyProcess, mut cmd_rx: mpsc::Receiver<PtyCommand>) {
    let PtyProcess {
        master,
        mut child,
        mut writer,
        mut reader,
    } = process;

    let (chunk_tx, mut chunk_rx) = mpsc::channel::<Vec<u8>>(64);
    std::thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if chunk_tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let log_inner = inner.clone();
    let log_id = id.clone();
    let log_task = tokio::spawn(async move {
        let path = common::stdout_log_path(&log_inner.base, &log_id);
        let mut log_writer = LogWriter::open(&path).ok();
        while let Some(chunk) = chunk_rx.recv().await {
            if let Some(writer) = log_writer.as_mut() {
                let _ = writer.append(&chunk);
            }
            let runtime = log_inner.runtimes.lock().get(&log_id).cloned();
            if let Some(runtime) = runtime {
                let mut subscribers = runtime.subscribers.lock();
                subscribers.retain(|(_, tx)| tx.try_send(chunk.clone()).is_ok());
            }
        }
    });

    let cmd_task = tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                PtyCommand::Write(bytes) => {
                    let _ = writer.write_all(&bytes);
                }
                PtyCommand::Resize(cols, rows) => {
                    let _ = master.resize(PtySize {
                        rows,
                        cols,
                        pixel_width: 0,
                        pixel_height: 0,
                    });
                }
            }
        }
    });

    let exit_status = tokio::task::spawn_blocking(move || child.wait()).await;

    let exit_code = match exit_status {
        Ok(Ok(status)) => common::encode_exit_status_portable(&status),
        _ => -1,
    };

    let now = inner.clock.epoch_secs();
    let mut records = inner.records.lock();
    if let Some(record) = records.get_mut(&id) {
        record.status = ShellStatus::Exited;
        record.exit_code = Some(exit_code);
        record.pid = None;
        record.updated_at = now;
        let _ = common::persist(&inner.base, record);
    }
    drop(records);
    inner.runtimes.lock().remove(&id);

    cmd_task.abort();
    log_task.abort();
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
