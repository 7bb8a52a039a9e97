// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

fn store() -> (tempfile::TempDir, StateStore) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state_store.json");
    let store = StateStore::open(&path).unwrap();
    (dir, store)
}

#[test]
fn set_then_get_returns_same_json() {
    let (_dir, store) = store();
    store.set("k".into(), json!({"a": 1})).unwrap();
    let got = store.get(&["k".into()]);
    assert_eq!(got.get("k"), Some(&json!({"a": 1})));
}

#[test]
fn missing_key_is_absent_from_result() {
    let (_dir, store) = store();
    let got = store.get(&["missing".into()]);
    assert!(!got.contains_key("missing"));
}

#[test]
fn merge_shallow_combines_objects() {
    let (_dir, store) = store();
    store.set("k".into(), json!({"a": 1})).unwrap();
    store.merge("k".into(), json!({"b": 2})).unwrap();
    let got = store.get(&["k".into()]);
    assert_eq!(got.get("k"), Some(&json!({"a": 1, "b": 2})));
}

#[test]
fn merge_replaces_when_either_side_is_not_an_object() {
    let (_dir, store) = store();
    store.set("k".into(), json!([1, 2, 3])).unwrap();
    store.merge("k".into(), json!({"b": 2})).unwrap();
    let got = store.get(&["k".into()]);
    assert_eq!(got.get("k"), Some(&json!({"b": 2})));
}

#[test]
fn delete_reports_removed_count_and_clears_key() {
    let (_dir, store) = store();
    store.set("k".into(), json!(1)).unwrap();
    let removed = store.delete(&["k".into(), "other".into()]).unwrap();
    assert_eq!(removed, 1);
    assert!(store.get(&["k".into()]).is_empty());
}

#[test]
fn state_persists_across_store_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state_store.json");
    {
        let store = StateStore::open(&path).unwrap();
        store.set("k".into(), json!("v")).unwrap();
    }
    let reopened = StateStore::open(&path).unwrap();
    assert_eq!(reopened.get(&["k".into()]).get("k"), Some(&json!("v")));
}
