// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Supervisor/Runtime (spec §4.H): owns run identity, the host-bind
//! hot-switch, and graceful shutdown cascading across every subsystem. Also
//! owns the PID lock file that keeps two supervisors from sharing one
//! `TE_FRAMEWORK_DIR` (grounded on the teacher's `lifecycle.rs` lock-file
//! dance, adapted from `fs2::FileExt::try_lock_exclusive`).

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use oj_adapters::stats::ShellStats;
use oj_core::clock::{Clock, SystemClock};
use oj_core::error::ErrorKind;
use oj_engine::{jobs, FrameworkShellManager, JobRegistry, PtyShellManager, StateStore};

use crate::env::BindMode;
use crate::protocol::{ControlRequest, ControlResponse};

const SHUTDOWN_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("another supervisor already holds the lock at {0}")]
    AlreadyRunning(PathBuf),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a shared secret is configured and the request did not supply a matching token")]
    AuthRequired,
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::AlreadyRunning(_) => ErrorKind::Conflict,
            SupervisorError::Io { .. } => ErrorKind::Io,
            SupervisorError::AuthRequired => ErrorKind::AuthRequired,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FrameworkShellMetrics {
    pub num_shells: usize,
    pub num_running: usize,
    pub memory_rss: u64,
}

#[derive(Debug, Serialize)]
pub struct InteractiveSessionMetrics {
    pub total: usize,
    pub matching_run: usize,
}

#[derive(Debug, Serialize)]
pub struct RuntimeMetrics {
    pub run_id: String,
    pub supervisor_pid: u32,
    pub app_pid: u32,
    pub uptime_secs: u64,
    pub framework_shells: FrameworkShellMetrics,
    pub interactive_sessions: InteractiveSessionMetrics,
}

/// Owns the subsystems' lifecycle and exposes the tiny control plane from
/// spec §4.H. Cheap to clone (all fields are `Arc`/`RwLock`-backed).
#[derive(Clone)]
pub struct Supervisor {
    run_id: String,
    started_at: Instant,
    bind_host: Arc<RwLock<String>>,
    shell_token: Option<String>,
    framework_shells: FrameworkShellManager,
    pty_shells: PtyShellManager,
    jobs: JobRegistry,
    state: Arc<StateStore>,
    // Held for the process lifetime to keep the exclusive lock; never read.
    _lock_file: Arc<File>,
}

impl Supervisor {
    /// Acquire the PID lock, load persisted records, and bring up every
    /// subsystem. Fails with `AlreadyRunning` if another supervisor already
    /// holds `${framework_dir}/daemon.pid`.
    pub fn start(framework_dir: PathBuf, extensions_dir: PathBuf, run_id: String, bind_mode: BindMode) -> Result<Self, SupervisorError> {
        std::fs::create_dir_all(&framework_dir).map_err(|e| SupervisorError::Io {
            path: framework_dir.clone(),
            source: e,
        })?;
        std::fs::create_dir_all(&extensions_dir).map_err(|e| SupervisorError::Io {
            path: extensions_dir.clone(),
            source: e,
        })?;

        let lock_path = framework_dir.join("daemon.pid");
        let lock_file = acquire_lock(&lock_path)?;

        std::fs::write(framework_dir.join("run_id"), &run_id).map_err(|e| SupervisorError::Io {
            path: framework_dir.join("run_id"),
            source: e,
        })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let shell_max = oj_engine::env::shell_max();

        let framework_shells = FrameworkShellManager::new(
            framework_dir.join("framework_shells"),
            home_dir(),
            run_id.clone(),
            shell_max,
            clock.clone(),
        );
        framework_shells.load_persisted().map_err(|e| SupervisorError::Io {
            path: framework_dir.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        framework_shells.sweep();

        let pty_shells = PtyShellManager::new(framework_dir.join("terminal_shells"), home_dir(), run_id.clone(), shell_max, clock.clone());
        pty_shells.load_persisted().map_err(|e| SupervisorError::Io {
            path: framework_dir.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        pty_shells.sweep();

        let jobs = JobRegistry::open(
            extensions_dir.join("jobs.json"),
            home_dir(),
            clock.clone(),
            jobs::handlers::bootstrap_handlers(),
            oj_engine::env::job_workers(),
        )
        .map_err(|e| SupervisorError::Io {
            path: extensions_dir.join("jobs.json"),
            source: std::io::Error::other(e.to_string()),
        })?;

        let state = StateStore::open(extensions_dir.join("state.json")).map_err(|e| SupervisorError::Io {
            path: extensions_dir.join("state.json"),
            source: std::io::Error::other(e.to_string()),
        })?;

        Ok(Self {
            run_id,
            started_at: Instant::now(),
            bind_host: Arc::new(RwLock::new(bind_mode.host().to_string())),
            shell_token: oj_engine::env::shell_token(),
            framework_shells,
            pty_shells,
            jobs,
            state: Arc::new(state),
            _lock_file: Arc::new(lock_file),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn current_bind(&self) -> String {
        self.bind_host.read().clone()
    }

    /// Idempotent: returns the current bind unchanged if `host` already
    /// matches.
    pub fn bind(&self, host: &str) -> String {
        let resolved = match host {
            "local" => "127.0.0.1",
            "broadcast" => "0.0.0.0",
            other => other,
        };
        let mut guard = self.bind_host.write();
        if guard.as_str() != resolved {
            *guard = resolved.to_string();
        }
        guard.clone()
    }

    pub fn metrics(&self) -> RuntimeMetrics {
        let shells = self.framework_shells.list();
        let num_running = shells.iter().filter(|s| s.is_running()).count();
        let memory_rss: u64 = shells
            .iter()
            .filter_map(|s| s.pid)
            .map(|pid| match oj_adapters::stats::read_stats(pid, 0) {
                ShellStats::Full { rss_bytes, .. } => rss_bytes,
                ShellStats::Minimal { .. } => 0,
            })
            .sum();

        let sessions = self.pty_shells.list();
        let matching_run = sessions.iter().filter(|s| s.run_id == self.run_id).count();

        let pid = std::process::id();
        RuntimeMetrics {
            run_id: self.run_id.clone(),
            supervisor_pid: pid,
            // No separate HTTP app process in this core (that layer is a
            // non-goal) — supervisor and "app" are the same process.
            app_pid: pid,
            uptime_secs: self.started_at.elapsed().as_secs(),
            framework_shells: FrameworkShellMetrics {
                num_shells: shells.len(),
                num_running,
                memory_rss,
            },
            interactive_sessions: InteractiveSessionMetrics {
                total: sessions.len(),
                matching_run,
            },
        }
    }

    /// Cascades shutdown per spec §4.H/§5: PTY shells first (SIGHUP), then
    /// framework shells (SIGTERM→SIGKILL), then cancel outstanding jobs —
    /// all within an aggregate 5s budget. Does not exit the process; the
    /// caller (the control-socket loop) does that once the response has been
    /// written back.
    pub async fn shutdown(&self) {
        let deadline = Instant::now() + SHUTDOWN_BUDGET;
        let _ = tokio::time::timeout(SHUTDOWN_BUDGET, self.shutdown_inner()).await;
        let remaining = deadline.saturating_duration_since(Instant::now());
        tracing::info!(remaining_ms = remaining.as_millis() as u64, "shutdown cascade finished");
    }

    async fn shutdown_inner(&self) {
        self.pty_shells.shutdown().await;
        self.framework_shells.shutdown().await;
        for job in self.jobs.list() {
            if !job.status.is_terminal() {
                let _ = self.jobs.cancel(&job.id);
            }
        }
    }

    fn check_token(&self, provided: &Option<String>) -> Result<(), SupervisorError> {
        match (&self.shell_token, provided) {
            (None, _) => Ok(()),
            (Some(expected), Some(got)) if expected == got => Ok(()),
            _ => Err(SupervisorError::AuthRequired),
        }
    }

    /// Dispatch one `ControlRequest`, mapping subsystem errors onto the
    /// `{ok, data?, error?}` envelope. Never panics: every subsystem error
    /// type exposes `kind()` and is rendered as `ControlResponse::error`.
    pub async fn dispatch(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::SpawnFrameworkShell { spawn, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.framework_shells.spawn(spawn))
            }
            ControlRequest::ListFrameworkShells => ControlResponse::ok(self.framework_shells.list()),
            ControlRequest::GetFrameworkShell { id } => respond(self.framework_shells.get(&id)),
            ControlRequest::FrameworkShellAction { id, action, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.framework_shells.action(&id, action).await)
            }
            ControlRequest::RemoveFrameworkShell { id, force, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.framework_shells.remove(&id, force).await.map(|_| json!({})))
            }

            ControlRequest::SpawnTerminalShell { spawn, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.pty_shells.spawn(spawn))
            }
            ControlRequest::ListTerminalShells => ControlResponse::ok(self.pty_shells.list()),
            ControlRequest::GetTerminalShell { id } => respond(self.pty_shells.get(&id)),
            ControlRequest::TerminalShellAction { id, action, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.pty_shells.action(&id, action).await)
            }
            ControlRequest::RemoveTerminalShell { id, force, token } => {
                if let Err(e) = self.check_token(&token) {
                    return ControlResponse::error(e.to_string());
                }
                respond(self.pty_shells.remove(&id, force).await.map(|_| json!({})))
            }
            ControlRequest::TerminalWrite { id, data } => respond(self.pty_shells.write(&id, data).await.map(|_| json!({}))),
            ControlRequest::TerminalResize { id, cols, rows } => {
                respond(self.pty_shells.resize(&id, cols, rows).await.map(|_| json!({})))
            }

            ControlRequest::SubmitJob { kind, params } => respond(self.jobs.submit(kind, params)),
            ControlRequest::ListJobs => ControlResponse::ok(self.jobs.list()),
            ControlRequest::GetJob { id } => respond(self.jobs.get(&id)),
            ControlRequest::CancelJob { id } => respond(self.jobs.cancel(&id)),
            ControlRequest::RemoveJob { id } => respond(self.jobs.remove(&id).map(|_| json!({}))),

            ControlRequest::StateGet { keys } => ControlResponse::ok(self.state.get(&keys)),
            ControlRequest::StateSet { key, value } => respond(self.state.set(key, value).map(|_| json!({}))),
            ControlRequest::StateDelete { keys } => respond(self.state.delete(&keys).map(|count| json!({ "deleted": count }))),

            ControlRequest::RuntimeMetrics => ControlResponse::ok(self.metrics()),
            ControlRequest::RuntimeBind { host } => ControlResponse::ok(json!({ "host": self.bind(&host) })),
            ControlRequest::RuntimeShutdown => {
                // Respond first, then cascade shutdown and exit — the caller
                // needs the envelope flushed before the process disappears.
                let supervisor = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    supervisor.shutdown().await;
                    std::process::exit(0);
                });
                ControlResponse::ok_empty()
            }
        }
    }
}

fn respond<T: Serialize, E: std::fmt::Display>(result: Result<T, E>) -> ControlResponse {
    match result {
        Ok(value) => ControlResponse::ok(value),
        Err(e) => ControlResponse::error(e.to_string()),
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/".to_string()))
}

fn acquire_lock(path: &Path) -> Result<File, SupervisorError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| SupervisorError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    file.try_lock_exclusive().map_err(|_| SupervisorError::AlreadyRunning(path.to_path_buf()))?;

    let mut file = file;
    file.set_len(0).map_err(|e| SupervisorError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    writeln!(file, "{}", std::process::id()).map_err(|e| SupervisorError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(file)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
