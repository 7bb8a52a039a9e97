// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn home() -> PathBuf {
    PathBuf::from("/home/termux")
}

#[test]
fn expands_bare_tilde() {
    let resolved = resolve("~", &home()).unwrap();
    assert_eq!(resolved, home());
}

#[test]
fn expands_tilde_with_subpath() {
    let resolved = resolve("~/projects/app", &home()).unwrap();
    assert_eq!(resolved, home().join("projects/app"));
}

#[test]
fn accepts_relative_path_under_home() {
    let resolved = resolve("downloads/file.7z", &home()).unwrap();
    assert_eq!(resolved, home().join("downloads/file.7z"));
}

#[test]
fn rejects_absolute_path_outside_home() {
    let err = resolve("/etc/passwd", &home()).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::PathEscape);
}

#[test]
fn rejects_dotdot_escape() {
    let err = resolve("../../etc/passwd", &home()).unwrap_err();
    assert!(matches!(err, SandboxError::Escape(_)));
}

#[test]
fn rejects_embedded_nul() {
    let err = resolve("foo\0bar", &home()).unwrap_err();
    assert!(matches!(err, SandboxError::Invalid(_)));
}

#[test]
fn normalizes_internal_dotdot_that_stays_inside_home() {
    let resolved = resolve("projects/a/../b", &home()).unwrap();
    assert_eq!(resolved, home().join("projects/b"));
}

#[test]
fn resolve_cwd_defaults_to_home() {
    let resolved = resolve_cwd(None, &home()).unwrap();
    assert_eq!(resolved, home());
    let resolved = resolve_cwd(Some(""), &home()).unwrap();
    assert_eq!(resolved, home());
}
