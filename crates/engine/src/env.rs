// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate (spec §6).

use std::path::PathBuf;

const DEFAULT_SHELL_MAX: usize = 5;
const DEFAULT_JOB_WORKERS: usize = 4;

/// Resolve `TE_FRAMEWORK_DIR`: env var, else `$HOME/.cache/te_framework`.
pub fn framework_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TE_FRAMEWORK_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
    PathBuf::from(home).join(".cache/te_framework")
}

/// State-store / jobs-journal root, independent of `TE_FRAMEWORK_DIR` (spec §6).
pub fn extensions_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
    PathBuf::from(home).join(".cache/termux_extensions")
}

/// Cap on concurrent running framework shells, `TE_FRAMEWORK_SHELL_MAX`.
pub fn shell_max() -> usize {
    std::env::var("TE_FRAMEWORK_SHELL_MAX")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_SHELL_MAX)
}

/// Shared-secret required on mutating shell endpoints, if configured. The
/// header check itself belongs to the (non-goal) HTTP layer; the engine only
/// exposes the expected value for that layer to compare against.
pub fn shell_token() -> Option<String> {
    std::env::var("TE_FRAMEWORK_SHELL_TOKEN").ok()
}

/// Job worker pool size, `TE_JOB_WORKERS` (ambient addition, default 4).
pub fn job_workers() -> usize {
    std::env::var("TE_JOB_WORKERS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_JOB_WORKERS)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
