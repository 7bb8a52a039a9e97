// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for liveness probe commands.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for archive/bulk-copy handler subprocess steps.
pub const HANDLER_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting timeout
/// expiration into a descriptive error message. The child process is killed
/// automatically if the timeout elapses (via the tokio `Child` drop impl).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{description} failed: {io_err}")),
        Err(_elapsed) => Err(format!(
            "{description} timed out after {}s",
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
