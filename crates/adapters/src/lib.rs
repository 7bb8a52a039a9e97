// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-adapters: the only crate in the workspace allowed to touch processes,
//! PTYs, and the OS process table directly.

pub mod process;
pub mod pty;
pub mod stats;
pub mod subprocess;

pub use process::{is_alive, send_signal, spawn_detached, ProcessError};
pub use pty::{PtyError, PtyProcess};
pub use stats::{read_stats, ShellStats};
