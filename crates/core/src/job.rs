// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and status machine (spec §3, §4.G).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Progress {
    pub fn new(completed: u64, total: u64, unit: Option<&str>) -> Self {
        Self {
            completed,
            total,
            unit: unit.map(str::to_string),
        }
    }
}

/// A short-lived asynchronous task tracked by the Job Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub ended_at: Option<u64>,
    #[serde(default)]
    pub cancel_requested: bool,
}

impl Job {
    pub fn new(id: JobId, kind: impl Into<String>, params: Value, now_ms: u64) -> Self {
        Self {
            id,
            kind: kind.into(),
            params,
            status: JobStatus::Pending,
            message: None,
            progress: None,
            result: None,
            error: None,
            created_at: now_ms,
            updated_at: now_ms,
            started_at: None,
            ended_at: None,
            cancel_requested: false,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
