// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation for shells, jobs, and supervisor runs.

use std::time::{SystemTime, UNIX_EPOCH};

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`, and
/// `Borrow<str>` implementations so the wrapper can be used as a `HashMap` key
/// without an extra allocation at lookup time.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier for a framework or PTY shell: `fs_<unix_ms>_<8hex>`.
    pub struct ShellId;
}

define_id! {
    /// Identifier for a job: `job_<unix_ms>_<8hex>`.
    pub struct JobId;
}

define_id! {
    /// Identifier for a supervisor run: `run_<unix_ms>_<8hex>`.
    pub struct RunId;
}

fn unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn hex8() -> String {
    let bytes: [u8; 4] = uuid::Uuid::new_v4().as_bytes()[..4].try_into().unwrap_or([0; 4]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl ShellId {
    /// Generate a fresh `fs_<unix_ms>_<8hex>` identifier.
    pub fn generate() -> Self {
        Self(format!("fs_{}_{}", unix_ms(), hex8()))
    }
}

impl JobId {
    /// Generate a fresh `job_<unix_ms>_<8hex>` identifier.
    pub fn generate() -> Self {
        Self(format!("job_{}_{}", unix_ms(), hex8()))
    }
}

impl RunId {
    /// Generate a fresh `run_<unix_ms>_<8hex>` identifier.
    pub fn generate() -> Self {
        Self(format!("run_{}_{}", unix_ms(), hex8()))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
