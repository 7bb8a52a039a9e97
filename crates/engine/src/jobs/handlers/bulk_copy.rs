// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bulk_copy`/`bulk_move` job handler: copies or moves a list of sources
//! into a destination directory, reporting byte-total progress and a
//! per-item result summary. `bulk_move` rolls forward item-by-item with no
//! rollback — a partially completed move leaves already-moved items moved
//! (spec §4.G Non-goals explicitly rule out transactional rollback).

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use oj_core::sandbox;

use crate::jobs::{JobCtx, JobHandler};

pub struct BulkCopyHandler {
    move_mode: bool,
}

impl BulkCopyHandler {
    pub fn copy() -> Self {
        Self { move_mode: false }
    }

    pub fn mv() -> Self {
        Self { move_mode: true }
    }
}

#[derive(Debug, Deserialize)]
struct Params {
    sources: Vec<String>,
    destination: String,
}

#[derive(Debug, Serialize)]
struct ItemResult {
    source: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[async_trait]
impl JobHandler for BulkCopyHandler {
    async fn run(&self, ctx: &JobCtx, params: Value) -> Result<Value, String> {
        let params: Params = serde_json::from_value(params).map_err(|e| format!("invalid params: {e}"))?;
        if params.sources.is_empty() {
            return Err("sources must be non-empty".to_string());
        }

        let destination = sandbox::resolve(&params.destination, ctx.home()).map_err(|e| e.to_string())?;
        std::fs::create_dir_all(&destination).map_err(|e| format!("create destination: {e}"))?;

        let mut resolved = Vec::with_capacity(params.sources.len());
        let mut total_bytes: u64 = 0;
        for source in &params.sources {
            let path = sandbox::resolve(source, ctx.home()).map_err(|e| e.to_string())?;
            let size = path_size(&path).unwrap_or(0);
            total_bytes += size;
            resolved.push((source.clone(), path, size));
        }

        ctx.set_message(if self.move_mode { "moving" } else { "copying" });
        ctx.report_progress(0, total_bytes.max(1), Some("bytes"));

        let mut completed: u64 = 0;
        let mut results = Vec::with_capacity(resolved.len());
        let mut was_cancelled = false;
        for (label, path, size) in resolved {
            if ctx.check_cancelled() {
                was_cancelled = true;
                break;
            }
            let Some(name) = path.file_name() else {
                results.push(ItemResult {
                    source: label,
                    ok: false,
                    error: Some("source has no file name".to_string()),
                });
                continue;
            };
            let dest_path = destination.join(name);

            let outcome = if self.move_mode {
                move_one(&path, &dest_path)
            } else {
                copy_recursive(&path, &dest_path)
            };

            match outcome {
                Ok(()) => {
                    completed += size;
                    results.push(ItemResult {
                        source: label,
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => results.push(ItemResult {
                    source: label,
                    ok: false,
                    error: Some(e),
                }),
            }
            ctx.report_progress(completed, total_bytes.max(1), Some("bytes"));
        }

        if was_cancelled {
            return Err("cancelled".to_string());
        }

        serde_json::to_value(results).map_err(|e| e.to_string())
    }
}

fn move_one(src: &Path, dest: &Path) -> Result<(), String> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Cross-device move: fall back to copy-then-remove.
            copy_recursive(src, dest)?;
            remove_path(src)
        }
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> Result<(), String> {
    let metadata = std::fs::symlink_metadata(src).map_err(|e| e.to_string())?;
    if metadata.is_dir() {
        std::fs::create_dir_all(dest).map_err(|e| e.to_string())?;
        for entry in std::fs::read_dir(src).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::copy(src, dest).map(|_| ()).map_err(|e| e.to_string())
    }
}

fn remove_path(path: &Path) -> Result<(), String> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| e.to_string())?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path).map_err(|e| e.to_string())
    } else {
        std::fs::remove_file(path).map_err(|e| e.to_string())
    }
}

fn path_size(path: &Path) -> Option<u64> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if metadata.is_dir() {
        let mut total = 0u64;
        for entry in std::fs::read_dir(path).ok()? {
            let entry = entry.ok()?;
            total += path_size(&entry.path()).unwrap_or(0);
        }
        Some(total)
    } else {
        Some(metadata.len())
    }
}

#[cfg(test)]
#[path = "bulk_copy_tests.rs"]
mod tests;
