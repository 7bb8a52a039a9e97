// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-engine: the control-plane core. Wires the Framework Shell Manager
//! (§4.E), PTY Shell Manager (§4.F), Job Registry (§4.G), and Key/Value
//! State Store (§4.D) on top of `oj-storage` persistence and `oj-adapters`
//! process/PTY primitives. `oj-daemon` is the only caller: it owns the
//! control socket and maps wire requests onto these managers.

pub mod env;
pub mod jobs;
pub mod shells;
pub mod state;

pub use jobs::{HandlerRegistry, Job, JobCtx, JobError, JobHandler, JobRegistry};
pub use shells::{FrameworkShellManager, PtyShellManager, ShellError, SpawnFrameworkShell, SpawnPtyShell, SubscriberToken};
pub use state::{StateError, StateStore};
