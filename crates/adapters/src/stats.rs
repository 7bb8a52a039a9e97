// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! psutil-style resource stats for a supervised pid (spec §4.E).

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, System};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ShellStats {
    /// Full stats, when the OS process table could be read.
    Full {
        cpu_percent: f32,
        rss_bytes: u64,
        num_threads: u64,
        uptime_secs: u64,
    },
    /// Fallback when detailed stats aren't available.
    Minimal { alive: bool, uptime_secs: u64 },
}

/// Read current resource stats for `pid`, falling back to `{alive, uptime}`
/// when the process table entry can't be resolved (spec §4.E).
pub fn read_stats(pid: u32, uptime_secs: u64) -> ShellStats {
    let mut system = System::new();
    system.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[Pid::from_u32(pid)]),
        true,
        ProcessRefreshKind::everything(),
    );

    match system.process(Pid::from_u32(pid)) {
        Some(process) => ShellStats::Full {
            cpu_percent: process.cpu_usage(),
            rss_bytes: process.memory(),
            num_threads: process.tasks().map(|t| t.len() as u64).unwrap_or(1),
            uptime_secs,
        },
        None => ShellStats::Minimal {
            alive: crate::process::is_alive(pid),
            uptime_secs,
        },
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
