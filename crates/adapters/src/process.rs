// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Low-level child process control for framework shells.
//!
//! Children are launched detached into their own session/process group so
//! they survive the supervisor's own restarts (spec §4.E), and are signaled
//! directly by pid rather than through the `tokio::process::Child` handle so
//! a `stop` (SIGTERM) and a `kill` (SIGKILL) are distinguishable — plain
//! `Child::kill()` always sends `SIGKILL` on Unix.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::process::{Child, Command};

use oj_core::error::ErrorKind;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("signal delivery failed: {0}")]
    SignalFailed(#[from] nix::Error),
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::SpawnFailed(_) => ErrorKind::SpawnFailed,
            ProcessError::SignalFailed(_) => ErrorKind::Internal,
        }
    }
}

/// Spawn `command` (argv[0] is the program) in `cwd` with `env` overlaid on
/// the current process environment, detached into a new process group, with
/// stdout/stderr piped for the caller to copy into the log tail buffer.
pub fn spawn_detached(
    command: &[String],
    cwd: &Path,
    env: &HashMap<String, String>,
) -> Result<Child, ProcessError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| ProcessError::SpawnFailed("empty command".into()))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    for (key, value) in env {
        cmd.env(key, value);
    }

    #[cfg(unix)]
    {
        // New process group with this child as the leader, so the whole
        // group can be signaled and survives the supervisor exiting.
        cmd.process_group(0);
    }

    cmd.spawn()
        .map_err(|e| ProcessError::SpawnFailed(e.to_string()))
}

/// Send a POSIX signal to `pid`.
pub fn send_signal(pid: u32, sig: Signal) -> Result<(), ProcessError> {
    signal::kill(Pid::from_raw(pid as i32), sig).map_err(ProcessError::from)
}

/// Probe whether `pid` is alive, without reaping it (signal 0).
pub fn is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
