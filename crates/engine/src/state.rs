// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/Value State Store facade (spec §4.D): validates `StateEntry` constraints
//! before delegating to `oj_storage::StateStore`, which owns the single mutex
//! and the on-disk document.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use oj_core::error::ErrorKind;
use oj_core::state::StateEntryError;
use oj_storage::{StateStore as Store, StoreError};

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Entry(#[from] StateEntryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::Entry(e) => e.kind(),
            StateError::Store(e) => e.kind(),
        }
    }
}

/// The process-wide KV store used by the UI for cross-reload persistence.
pub struct StateStore {
    store: Store,
}

impl StateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        Ok(Self {
            store: Store::open(path.as_ref())?,
        })
    }

    /// Batched get: missing keys are simply absent from the returned map.
    pub fn get(&self, keys: &[String]) -> HashMap<String, Value> {
        self.store.get(keys)
    }

    pub fn set(&self, key: String, value: Value) -> Result<(), StateError> {
        oj_core::state::StateEntry::new(key.clone(), value.clone())?;
        self.store.set(key, value)?;
        Ok(())
    }

    pub fn merge(&self, key: String, value: Value) -> Result<(), StateError> {
        oj_core::state::StateEntry::new(key.clone(), value.clone())?;
        self.store.merge(key, value)?;
        Ok(())
    }

    pub fn delete(&self, keys: &[String]) -> Result<usize, StateError> {
        Ok(self.store.delete(keys)?)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
