// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Framework Shell Manager (spec §4.E) and PTY Shell Manager (spec §4.F):
//! two managers over the same on-disk record layout and state machine,
//! differing only in whether the child runs under a controlling PTY.

pub mod common;
pub mod framework;
pub mod pty;

pub use common::ShellError;
pub use framework::{FrameworkShellManager, SpawnFrameworkShell};
pub use pty::{PtyShellManager, SpawnPtyShell, SubscriberToken};
