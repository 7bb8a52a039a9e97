// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file store (spec §4.B).
//!
//! Write = write-to-temp-in-same-directory + fsync + rename, the same
//! durability sequence the teacher's checkpoint writer uses for snapshots.
//! Read is best-effort: a corrupt file is moved aside and an empty/default
//! value is returned rather than propagated as an error.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use oj_core::error::ErrorKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

/// Read a JSON document from `path`. Returns `Ok(None)` if the file is
/// missing. On a parse failure, the file is renamed aside to
/// `<name>.corrupt-<unix_ms>` and `Ok(None)` is returned (logged at `warn`).
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt json document, moving aside");
            quarantine(path);
            Ok(None)
        }
    }
}

fn quarantine(path: &Path) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let mut corrupt_name = path.as_os_str().to_owned();
    corrupt_name.push(format!(".corrupt-{ts}"));
    if let Err(e) = fs::rename(path, PathBuf::from(corrupt_name)) {
        tracing::warn!(path = %path.display(), error = %e, "failed to quarantine corrupt document");
    }
}

/// Atomically overwrite `path` with the JSON serialization of `value`.
///
/// Writes to a temp file in the same directory, fsyncs it, sets owner-only
/// permissions, then renames over the target. The rename is atomic on a
/// POSIX filesystem, so a reader never observes a partially written file.
pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StoreError::Io {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let serialized = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string()),
        std::process::id()
    ));

    {
        let mut file = File::create(&tmp_path).map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.write_all(&serialized).map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.sync_all().map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        set_owner_only(&file);
    }

    fs::rename(&tmp_path, path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(unix)]
fn set_owner_only(file: &File) {
    use std::os::unix::fs::PermissionsExt;
    let _ = file.set_permissions(fs::Permissions::from_mode(0o600));
}

#[cfg(not(unix))]
fn set_owner_only(_file: &File) {}

#[cfg(test)]
#[path = "json_store_tests.rs"]
mod tests;
