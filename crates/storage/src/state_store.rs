// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value state store (spec §4.D): a single JSON document guarded by one
//! mutex, serializing reads and writes.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde_json::Value;

use crate::json_store::{self, StoreError};

pub struct StateStore {
    path: PathBuf,
    document: Mutex<HashMap<String, Value>>,
}

impl StateStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = json_store::read::<HashMap<String, Value>>(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Batched get: missing keys are simply absent from the returned map.
    pub fn get(&self, keys: &[String]) -> HashMap<String, Value> {
        let document = self.document.lock();
        keys.iter()
            .filter_map(|k| document.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Replace the value at `key` wholesale.
    pub fn set(&self, key: String, value: Value) -> Result<(), StoreError> {
        let mut document = self.document.lock();
        document.insert(key, value);
        json_store::write(&self.path, &*document)
    }

    /// Shallow-merge `value` into the existing value at `key` when both are
    /// JSON objects; otherwise behaves like `set`.
    pub fn merge(&self, key: String, value: Value) -> Result<(), StoreError> {
        let mut document = self.document.lock();
        match (document.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k, v);
                }
            }
            (_, incoming) => {
                document.insert(key, incoming);
            }
        }
        json_store::write(&self.path, &*document)
    }

    /// Remove each key present; returns the count actually removed.
    pub fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut document = self.document.lock();
        let mut removed = 0usize;
        for key in keys {
            if document.remove(key).is_some() {
                removed += 1;
            }
        }
        json_store::write(&self.path, &*document)?;
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
