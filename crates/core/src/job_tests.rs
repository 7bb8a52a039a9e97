// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn new_job_starts_pending_with_no_terminal_fields() {
    let job = Job::new(JobId::generate(), "extract_archive", json!({}), 1_000);
    assert_eq!(job.status, JobStatus::Pending);
    assert!(!job.status.is_terminal());
    assert!(job.error.is_none());
    assert!(job.result.is_none());
}

#[test]
fn terminal_statuses_are_terminal() {
    assert!(JobStatus::Succeeded.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
}

#[test]
fn job_serializes_type_field_under_kind_rename() {
    let job = Job::new(JobId::generate(), "bulk_copy", json!({"a": 1}), 0);
    let value = serde_json::to_value(&job).unwrap();
    assert_eq!(value["type"], "bulk_copy");
}
