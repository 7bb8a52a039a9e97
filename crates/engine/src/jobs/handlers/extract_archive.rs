// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `extract_archive` job handler: shells out to `7zz`, streaming its stdout
//! and parsing `NN%` progress tokens character-by-character as they arrive
//! (7-Zip emits them without trailing newlines, so line-buffered parsing
//! would stall until the next line break).

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use oj_core::sandbox;

use crate::jobs::{JobCtx, JobHandler};

pub struct ExtractArchiveHandler;

#[derive(Debug, Deserialize)]
struct Params {
    archive_path: String,
    #[serde(default)]
    items: Vec<String>,
    destination: String,
}

#[async_trait]
impl JobHandler for ExtractArchiveHandler {
    async fn run(&self, ctx: &JobCtx, params: Value) -> Result<Value, String> {
        let params: Params = serde_json::from_value(params).map_err(|e| format!("invalid params: {e}"))?;
        let archive_path = sandbox::resolve(&params.archive_path, ctx.home()).map_err(|e| e.to_string())?;
        let destination = sandbox::resolve(&params.destination, ctx.home()).map_err(|e| e.to_string())?;
        std::fs::create_dir_all(&destination).map_err(|e| format!("create destination: {e}"))?;

        let mut cmd = Command::new("7zz");
        cmd.arg("x")
            .arg(&archive_path)
            .arg(format!("-o{}", destination.display()))
            .arg("-y")
            .arg("-bsp1");
        for item in &params.items {
            cmd.arg(item);
        }
        cmd.current_dir(&destination);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| format!("spawn 7zz: {e}"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| "7zz did not expose stdout".to_string())?;

        ctx.set_message("extracting");
        let mut digits = String::new();
        let mut buf = [0u8; 256];
        loop {
            tokio::select! {
                _ = ctx.cancel_token().cancelled() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err("cancelled".to_string());
                }
                read_result = stdout.read(&mut buf) => {
                    let n = read_result.map_err(|e| format!("reading 7zz output: {e}"))?;
                    if n == 0 {
                        break;
                    }
                    for &byte in &buf[..n] {
                        match byte {
                            b'0'..=b'9' => digits.push(byte as char),
                            b'%' => {
                                if let Ok(pct) = digits.parse::<u64>() {
                                    ctx.report_progress(pct.min(100), 100, Some("percent"));
                                }
                                digits.clear();
                            }
                            _ => digits.clear(),
                        }
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| format!("waiting for 7zz: {e}"))?;
        if !status.success() {
            return Err(format!("7zz exited with {status}"));
        }
        ctx.report_progress(100, 100, Some("percent"));
        ctx.set_message(format!("extracted to {}", params.destination));
        Ok(json!({ "destination": destination.display().to_string() }))
    }
}

#[cfg(test)]
#[path = "extract_archive_tests.rs"]
mod tests;
