// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared path layout, persistence, and error type for the Framework Shell
//! Manager and PTY Shell Manager (spec §4.E/§4.F share one state machine and
//! on-disk layout; only the runtime handle differs).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use oj_core::error::ErrorKind;
use oj_core::id::ShellId;
use oj_core::sandbox::SandboxError;
use oj_core::shell::FrameworkShellRecord;
use oj_storage::StoreError;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Process(#[from] oj_adapters::ProcessError),
    #[error("shell not found: {0}")]
    NotFound(ShellId),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("shell {0} did not accept input within the backpressure window")]
    Busy(ShellId),
}

impl ShellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::Sandbox(e) => e.kind(),
            ShellError::Store(e) => e.kind(),
            ShellError::Process(e) => e.kind(),
            ShellError::NotFound(_) => ErrorKind::NotFound,
            ShellError::Conflict(_) => ErrorKind::Conflict,
            ShellError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ShellError::Busy(_) => ErrorKind::Conflict,
        }
    }
}

pub fn meta_dir(base: &Path, id: &ShellId) -> PathBuf {
    base.join("meta").join(id.as_str())
}

pub fn meta_path(base: &Path, id: &ShellId) -> PathBuf {
    meta_dir(base, id).join("meta.json")
}

pub fn logs_dir(base: &Path) -> PathBuf {
    base.join("logs")
}

pub fn stdout_log_path(base: &Path, id: &ShellId) -> PathBuf {
    logs_dir(base).join(format!("{}.stdout.log", id.as_str()))
}

pub fn stderr_log_path(base: &Path, id: &ShellId) -> PathBuf {
    logs_dir(base).join(format!("{}.stderr.log", id.as_str()))
}

/// Atomically persist `record` to its metadata file.
pub fn persist(base: &Path, record: &FrameworkShellRecord) -> Result<(), ShellError> {
    oj_storage::json_store::write(&meta_path(base, &record.id), record)?;
    Ok(())
}

/// Load a single record by ID, if its metadata file exists and parses.
pub fn load(base: &Path, id: &ShellId) -> Result<Option<FrameworkShellRecord>, ShellError> {
    Ok(oj_storage::json_store::read(&meta_path(base, id))?)
}

/// List every record found under `meta/`, skipping entries that fail to
/// parse (treated as already-quarantined by `json_store::read`).
pub fn list_all(base: &Path) -> Result<Vec<FrameworkShellRecord>, ShellError> {
    let dir = base.join("meta");
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ShellError::Store(StoreError::Io {
                path: dir,
                source: e,
            }))
        }
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let meta = entry.path().join("meta.json");
        if let Some(record) = oj_storage::json_store::read::<FrameworkShellRecord>(&meta)? {
            records.push(record);
        }
    }
    records.sort_by_key(|r| r.created_at);
    Ok(records)
}

/// Remove a record's metadata directory and log files. Idempotent: missing
/// files are not an error.
pub fn remove_files(base: &Path, id: &ShellId) -> Result<(), ShellError> {
    let dir = meta_dir(base, id);
    if let Err(e) = fs::remove_dir_all(&dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Err(ShellError::Store(StoreError::Io {
                path: dir,
                source: e,
            }));
        }
    }
    for path in [stdout_log_path(base, id), stderr_log_path(base, id)] {
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(ShellError::Store(StoreError::Io { path, source: e }));
            }
        }
    }
    Ok(())
}

/// Encode a `std::process::ExitStatus` per spec §3: positive = exit status,
/// negative = signal number.
#[cfg(unix)]
pub fn encode_exit_status(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => -status.signal().unwrap_or(0),
    }
}

/// Encode a `portable_pty::ExitStatus` the same way as `encode_exit_status`.
/// `portable-pty` is cross-platform and does not surface the terminating
/// signal, so a non-zero, non-success exit is reported as its raw exit code
/// rather than a negative signal number — a known gap versus the POSIX
/// `Command`-based path in `encode_exit_status` above.
pub fn encode_exit_status_portable(status: &portable_pty::ExitStatus) -> i32 {
    if status.success() {
        0
    } else {
        status.exit_code() as i32
    }
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod tests;
