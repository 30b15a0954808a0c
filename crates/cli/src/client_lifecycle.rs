// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon stop and connection diagnostics

use std::path::PathBuf;

use crate::client::{timeout_exit, ClientError};
use crate::daemon_process::{
    cleanup_stale_pid, cleanup_stale_socket, daemon_dir, daemon_socket, force_kill_daemon,
    process_exists, read_daemon_pid, terminate_daemon, wait_for_exit,
};

/// Stop the daemon (SIGTERM first, then SIGKILL).
///
/// The protocol has no shutdown request, so this goes through the PID file.
/// Returns true if daemon was stopped, false if it wasn't running.
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let Some(pid) = read_daemon_pid()? else {
        cleanup_stale_socket()?;
        return Ok(false);
    };

    if !process_exists(pid) {
        cleanup_stale_socket()?;
        return Ok(false);
    }

    // SIGTERM lets the daemon stop the agent through its normal escalation
    terminate_daemon(pid);
    if !wait_for_exit(pid, crate::client::timeout_stop()).await {
        force_kill_daemon(pid);
        wait_for_exit(pid, timeout_exit()).await;
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
        let _ = std::fs::remove_file(dir.join("daemon.sock"));
    }

    Ok(true)
}

/// Write a diagnostic message to `~/.local/state/tether/cli.log`.
fn write_cli_log(message: String) {
    use std::io::Write;
    use std::time::SystemTime;

    let log_path = daemon_dir()
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".local/state/tether"))
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        })
        .join("cli.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let pid = std::process::id();
        let state_dir = crate::env::state_dir_raw().unwrap_or_else(|| "(not set)".to_string());

        let _ = writeln!(
            file,
            "[ts={}] pid={} TETHER_STATE_DIR={} {}",
            timestamp, pid, state_dir, message
        );
    }
}

/// Log a connection error for debugging.
///
/// The CLI is often run from a UI shell where stderr is not visible, so
/// failures to reach the daemon are also appended to `cli.log`.
pub fn log_connection_error(error: &ClientError) {
    let socket_path = daemon_socket()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unknown)".to_string());
    write_cli_log(format!("socket={} error={}", socket_path, error));
}
