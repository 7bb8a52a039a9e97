// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-storage: durable on-disk state for the framework.
//!
//! Everything here is built on one primitive — atomic whole-document JSON
//! writes (`json_store`) — plus one append-only primitive for supervised
//! child logs (`log_store`). There is no write-ahead log or event sourcing:
//! spec §4.G is explicit that the job journal is a single rewritten JSON
//! document, and the teacher's `Wal`/`Snapshot`/`checkpoint` machinery has no
//! counterpart here (see `DESIGN.md`).

pub mod json_store;
pub mod log_store;
pub mod state_store;

pub use json_store::StoreError;
pub use log_store::{LogStoreError, LogWriter};
pub use state_store::StateStore;
