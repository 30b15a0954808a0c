// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-lived subprocess helpers

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Interpreter names probed, in order, when none is configured.
pub const INTERPRETER_CANDIDATES: &[&str] = &["python3", "python", "py"];

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// An interpreter that answered `--version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: String,
    /// First line of the version banner, e.g. `Python 3.12.1`
    pub version: String,
}

/// Find the first candidate that runs `<candidate> --version` successfully.
pub async fn detect_interpreter(candidates: &[&str]) -> Option<Interpreter> {
    let timeout = crate::env::probe_timeout();
    for candidate in candidates {
        let mut cmd = Command::new(candidate);
        cmd.arg("--version").stdin(Stdio::null());
        match run_with_timeout(cmd, timeout, candidate).await {
            Ok(output) if output.status.success() => {
                // Python 2 printed its banner on stderr
                let banner = if output.stdout.is_empty() {
                    &output.stderr
                } else {
                    &output.stdout
                };
                let version = String::from_utf8_lossy(banner)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                tracing::debug!(program = candidate, %version, "interpreter found");
                return Some(Interpreter {
                    program: candidate.to_string(),
                    version,
                });
            }
            Ok(output) => {
                tracing::debug!(program = candidate, status = %output.status, "probe failed")
            }
            Err(e) => tracing::debug!(program = candidate, error = %e, "probe failed"),
        }
    }
    None
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
