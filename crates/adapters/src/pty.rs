// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY process primitives backed by `portable-pty`, the crate this pack's
//! terminal-shaped examples converge on (e.g. `portable_pty::{native_pty_system,
//! CommandBuilder, MasterPty, PtySize}` in the `dockge` and `skynet-terminal`
//! examples). The fan-out/reader-task concurrency model lives one layer up,
//! in `oj-engine::shells::pty` — this module only opens the PTY and exposes
//! its blocking read/write halves.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;

use oj_core::error::ErrorKind;

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("pty open failed: {0}")]
    Open(String),
    #[error("pty spawn failed: {0}")]
    Spawn(String),
    #[error("pty resize failed: {0}")]
    Resize(String),
    #[error("pty io failed: {0}")]
    Io(#[from] std::io::Error),
}

impl PtyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PtyError::Spawn(_) => ErrorKind::SpawnFailed,
            _ => ErrorKind::Internal,
        }
    }
}

/// A spawned PTY process: the master side (for resize + read/write halves)
/// and the child handle (for wait/kill).
pub struct PtyProcess {
    /// Exposed so `oj-engine`'s PTY writer task can resize the PTY from the
    /// same task that owns `writer`, without re-borrowing the whole struct
    /// after `writer`/`reader` have been moved out (`MasterPty::resize` takes
    /// `&self`, so this is safe to hand out alongside the other fields).
    pub master: Box<dyn MasterPty + Send>,
    pub child: Box<dyn Child + Send + Sync>,
    pub writer: Box<dyn Write + Send>,
    pub reader: Box<dyn Read + Send>,
}

impl PtyProcess {
    /// Spawn `command` (or the user's login shell if empty) in `cwd` with
    /// `env` overlaid, at the given initial window size.
    pub fn spawn(
        command: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
        cols: u16,
        rows: u16,
    ) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = if let Some((program, args)) = command.split_first() {
            let mut b = CommandBuilder::new(program);
            b.args(args);
            b
        } else {
            let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
            let mut b = CommandBuilder::new(&shell);
            b.arg("-l");
            b
        };
        cmd.cwd(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        Ok(Self {
            master: pair.master,
            child,
            writer,
            reader,
        })
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Resize(e.to_string()))
    }
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
