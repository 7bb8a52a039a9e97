// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control protocol: one `ControlRequest` variant per spec §6 wire
//! contract, dispatched by `Supervisor::dispatch` onto a `ControlResponse`
//! envelope (`{ok, data?, error?}`). This is the seam the (non-goal) HTTP
//! layer plugs into — `ControlRequest`/`ControlResponse` are not themselves
//! an HTTP API.

#[path = "protocol_wire.rs"]
mod wire;

pub use wire::{read_request, write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use oj_core::id::{JobId, ShellId};
use oj_core::shell::ShellAction;
use oj_engine::{SpawnFrameworkShell, SpawnPtyShell};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    SpawnFrameworkShell {
        spawn: SpawnFrameworkShell,
        #[serde(default)]
        token: Option<String>,
    },
    ListFrameworkShells,
    GetFrameworkShell {
        id: ShellId,
    },
    FrameworkShellAction {
        id: ShellId,
        action: ShellAction,
        #[serde(default)]
        token: Option<String>,
    },
    RemoveFrameworkShell {
        id: ShellId,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        token: Option<String>,
    },

    SpawnTerminalShell {
        spawn: SpawnPtyShell,
        #[serde(default)]
        token: Option<String>,
    },
    ListTerminalShells,
    GetTerminalShell {
        id: ShellId,
    },
    TerminalShellAction {
        id: ShellId,
        action: ShellAction,
        #[serde(default)]
        token: Option<String>,
    },
    RemoveTerminalShell {
        id: ShellId,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        token: Option<String>,
    },
    TerminalWrite {
        id: ShellId,
        data: Vec<u8>,
    },
    TerminalResize {
        id: ShellId,
        cols: u16,
        rows: u16,
    },

    SubmitJob {
        kind: String,
        #[serde(default)]
        params: Value,
    },
    ListJobs,
    GetJob {
        id: JobId,
    },
    CancelJob {
        id: JobId,
    },
    RemoveJob {
        id: JobId,
    },

    StateGet {
        keys: Vec<String>,
    },
    StateSet {
        key: String,
        value: Value,
    },
    StateDelete {
        keys: Vec<String>,
    },

    RuntimeMetrics,
    RuntimeBind {
        host: String,
    },
    RuntimeShutdown,
}

/// The wire envelope every response is wrapped in (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            ok: true,
            data: serde_json::to_value(data).ok(),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
