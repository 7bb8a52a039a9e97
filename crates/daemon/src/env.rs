// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable resolution for the supervisor binary (spec §6).
//! Shell/job/framework-dir knobs live in `oj_engine::env`; this module only
//! resolves the supervisor-specific ones: run identity, bind mode, and
//! logging.

use oj_core::id::RunId;

/// `local` binds `127.0.0.1`; anything else (including unset) binds
/// `0.0.0.0`, matching spec §6's `TE_RUN_MODE` default of `broadcast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    Local,
    Broadcast,
}

impl BindMode {
    pub fn host(self) -> &'static str {
        match self {
            BindMode::Local => "127.0.0.1",
            BindMode::Broadcast => "0.0.0.0",
        }
    }
}

/// `TE_RUN_ID`, else a freshly generated `run_<unix_ms>_<8hex>`.
pub fn run_id() -> String {
    std::env::var("TE_RUN_ID")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| RunId::generate().as_str().to_string())
}

/// `TE_RUN_MODE`: `local` maps to `BindMode::Local`, anything else
/// (including unset) to `BindMode::Broadcast`.
pub fn run_mode() -> BindMode {
    match std::env::var("TE_RUN_MODE").ok().as_deref() {
        Some("local") => BindMode::Local,
        _ => BindMode::Broadcast,
    }
}

/// `TE_LOG_LEVEL`, default `info`, fed straight to `tracing_subscriber`'s
/// `EnvFilter`.
pub fn log_level() -> String {
    std::env::var("TE_LOG_LEVEL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
