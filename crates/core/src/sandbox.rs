// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Home-directory sandbox: every path argument accepted from a caller must
//! resolve inside the user's home directory.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("path escapes home directory: {0}")]
    Escape(String),
    #[error("invalid path: {0}")]
    Invalid(String),
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::Escape(_) => ErrorKind::PathEscape,
            SandboxError::Invalid(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Resolve `input` against `home`, expanding `~`/`~/x`, normalizing `..`
/// lexically (no filesystem access, no symlink resolution), and rejecting
/// anything that would land outside `home`.
pub fn resolve(input: &str, home: &Path) -> Result<PathBuf, SandboxError> {
    if input.contains('\0') {
        return Err(SandboxError::Invalid("path contains NUL byte".into()));
    }

    let expanded = expand_tilde(input, home);
    let candidate = if expanded.is_absolute() {
        expanded
    } else {
        home.join(expanded)
    };

    let normalized = lexical_normalize(&candidate);
    let home_normalized = lexical_normalize(home);

    if normalized == home_normalized || normalized.starts_with(&home_normalized) {
        Ok(normalized)
    } else {
        Err(SandboxError::Escape(input.to_string()))
    }
}

/// Resolve a `cwd`-style argument, defaulting empty/`None` to `home`.
pub fn resolve_cwd(input: Option<&str>, home: &Path) -> Result<PathBuf, SandboxError> {
    match input {
        None => Ok(home.to_path_buf()),
        Some(s) if s.is_empty() => Ok(home.to_path_buf()),
        Some(s) => resolve(s, home),
    }
}

fn expand_tilde(input: &str, home: &Path) -> PathBuf {
    if input == "~" {
        home.to_path_buf()
    } else if let Some(rest) = input.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(input)
    }
}

/// Normalize `.`/`..` components without touching the filesystem (so this
/// works for paths that don't exist yet, e.g. a job's destination).
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
