// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn shell_id_has_expected_prefix_and_segments() {
    let id = ShellId::generate();
    let parts: Vec<&str> = id.as_str().split('_').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "fs");
    assert_eq!(parts[2].len(), 8);
}

#[test]
fn generated_ids_are_unique() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
}

#[test]
fn id_roundtrips_through_string() {
    let id = RunId::new("run_123_abcdef00");
    assert_eq!(id.to_string(), "run_123_abcdef00");
    let back: RunId = id.as_str().into();
    assert_eq!(id, back);
}
