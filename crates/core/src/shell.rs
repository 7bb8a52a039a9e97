// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializable record for a supervised background process (framework shell
//! or PTY shell — the two differ only in `uses_pty` and the optional window
//! size carried on PTY records).

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::ShellId;

/// `pending | running | exited | error` per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellStatus {
    Pending,
    Running,
    Exited,
    Error,
}

impl fmt::Display for ShellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShellStatus::Pending => "pending",
            ShellStatus::Running => "running",
            ShellStatus::Exited => "exited",
            ShellStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// `never | on-failure | always`, default `never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

/// The three lifecycle actions a caller may request on a running shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellAction {
    Stop,
    Kill,
    Restart,
}

/// A headless background process or PTY-backed process supervised by the
/// core. Runtime-only fields (log handles, PTY master, subscribers) live on
/// the in-memory handle in `oj-engine`, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkShellRecord {
    pub id: ShellId,
    pub command: Vec<String>,
    pub cwd: PathBuf,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub label: String,
    pub pid: Option<u32>,
    pub status: ShellStatus,
    pub exit_code: Option<i32>,
    pub created_at: u64,
    pub updated_at: u64,
    pub uses_pty: bool,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    pub run_id: String,
    /// Current PTY window size; `None` for non-PTY shells.
    #[serde(default)]
    pub cols: Option<u16>,
    #[serde(default)]
    pub rows: Option<u16>,
    /// Error string recorded when `status == Error` (spawn failure).
    #[serde(default)]
    pub spawn_error: Option<String>,
}

impl FrameworkShellRecord {
    /// `status == running` implies a live pid (invariant checked by `sweep`).
    pub fn is_running(&self) -> bool {
        matches!(self.status, ShellStatus::Running) && self.pid.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ShellStatus::Exited | ShellStatus::Error)
    }
}
