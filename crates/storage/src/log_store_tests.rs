// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn append_then_tail_returns_last_n_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.stdout.log");
    let mut writer = LogWriter::open(&path).unwrap();
    for i in 0..10 {
        writer.append(format!("line {i}\n").as_bytes()).unwrap();
    }
    let tail = tail_lines(&path, 3).unwrap();
    assert_eq!(tail, vec!["line 7", "line 8", "line 9"]);
}

#[test]
fn tail_of_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.log");
    assert!(tail_lines(&path, 5).unwrap().is_empty());
}

#[test]
fn tail_requesting_more_than_available_returns_all() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.stdout.log");
    let mut writer = LogWriter::open(&path).unwrap();
    writer.append(b"only\nline\n").unwrap();
    let tail = tail_lines(&path, 100).unwrap();
    assert_eq!(tail, vec!["only", "line"]);
}

#[test]
fn rotation_keeps_file_readable_and_bounded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.stdout.log");
    let mut writer = LogWriter::open(&path).unwrap();

    // Force several rotations by writing well past the cap.
    let chunk = "x".repeat(1024);
    for i in 0..(LOG_CAP_BYTES / 1024 * 3) {
        writer.append(format!("{chunk}-{i}\n").as_bytes()).unwrap();
    }

    let tail = tail_lines(&path, 5).unwrap();
    assert_eq!(tail.len(), 5);
    assert!(std::fs::metadata(&path).unwrap().len() < LOG_CAP_BYTES * 2);
}
