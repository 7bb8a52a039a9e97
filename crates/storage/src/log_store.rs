// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-shell log tail buffer (spec §4.C).
//!
//! Two append-only files per shell (`<id>.stdout.log`, `<id>.stderr.log`).
//! `LogWriter` copies bytes in as they arrive and rotates a file once it
//! crosses `LOG_CAP_BYTES` by rewriting the trailing ~75% to a temp file and
//! renaming over the original. The cap is a target, not a hard invariant
//! (spec §9), so rotation is checked opportunistically on append rather than
//! enforced against every possible writer.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use oj_core::error::ErrorKind;

/// Target size cap per log file before rotation kicks in.
pub const LOG_CAP_BYTES: u64 = 512 * 1024;

/// Fraction of the file kept after rotation.
const ROTATE_KEEP_RATIO: f64 = 0.75;

#[derive(Debug, Error)]
#[error("log store io error at {path}: {source}")]
pub struct LogStoreError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl LogStoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }

    fn at(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An append-only writer for a single log file, with opportunistic rotation.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    len: u64,
}

impl LogWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LogStoreError::at(&path, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LogStoreError::at(&path, e))?;
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self { path, file, len })
    }

    /// Append raw bytes, rotating the file first if it is already at or over
    /// the cap.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), LogStoreError> {
        if self.len >= LOG_CAP_BYTES {
            self.rotate()?;
        }
        self.file
            .write_all(bytes)
            .map_err(|e| LogStoreError::at(&self.path, e))?;
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), LogStoreError> {
        let keep_from = (self.len as f64 * (1.0 - ROTATE_KEEP_RATIO)) as u64;
        let mut full = Vec::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_end(&mut full))
            .map_err(|e| LogStoreError::at(&self.path, e))?;

        let tail = if (keep_from as usize) < full.len() {
            &full[keep_from as usize..]
        } else {
            &full[..]
        };

        let tmp_path = self.path.with_extension("log.rotate-tmp");
        {
            let mut tmp = File::create(&tmp_path).map_err(|e| LogStoreError::at(&tmp_path, e))?;
            tmp.write_all(tail)
                .map_err(|e| LogStoreError::at(&tmp_path, e))?;
            tmp.sync_all().map_err(|e| LogStoreError::at(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| LogStoreError::at(&self.path, e))?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogStoreError::at(&self.path, e))?;
        self.len = tail.len() as u64;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the last `n` newline-delimited records from `path` without loading
/// the whole file, by scanning backward in fixed-size blocks.
pub fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>, LogStoreError> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LogStoreError::at(path, e)),
    };

    const BLOCK: usize = 8 * 1024;
    let file_len = file
        .metadata()
        .map_err(|e| LogStoreError::at(path, e))?
        .len();

    let mut collected: Vec<u8> = Vec::new();
    let mut pos = file_len;
    let mut newline_count = 0usize;

    while pos > 0 && newline_count <= n {
        let read_size = BLOCK.min(pos as usize);
        pos -= read_size as u64;
        file.seek(SeekFrom::Start(pos))
            .map_err(|e| LogStoreError::at(path, e))?;
        let mut block = vec![0u8; read_size];
        file.read_exact(&mut block)
            .map_err(|e| LogStoreError::at(path, e))?;
        newline_count += block.iter().filter(|&&b| b == b'\n').count();

        let mut prefixed = block;
        prefixed.extend_from_slice(&collected);
        collected = prefixed;
    }

    let text = String::from_utf8_lossy(&collected);
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.len() > n {
        lines = lines.split_off(lines.len() - n);
    }
    Ok(lines.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
#[path = "log_store_tests.rs"]
mod tests;
