// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn rejects_empty_key() {
    assert_eq!(
        StateEntry::new("", json!(1)).unwrap_err(),
        StateEntryError::EmptyKey
    );
}

#[test]
fn rejects_key_with_nul() {
    assert_eq!(
        StateEntry::new("a\0b", json!(1)).unwrap_err(),
        StateEntryError::KeyHasNul
    );
}

#[test]
fn rejects_oversized_key() {
    let key = "k".repeat(MAX_KEY_LEN + 1);
    assert_eq!(
        StateEntry::new(key, json!(1)).unwrap_err(),
        StateEntryError::KeyTooLong
    );
}

#[test]
fn accepts_reasonable_entry() {
    let entry = StateEntry::new("theme", json!({"mode": "dark"})).unwrap();
    assert_eq!(entry.key, "theme");
}
