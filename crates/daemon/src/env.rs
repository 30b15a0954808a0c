// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: TETHER_STATE_DIR > XDG_STATE_HOME/tether > ~/.local/state/tether
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TETHER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tether"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/tether"))
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

pub fn interpreter() -> Option<String> {
    non_empty("TETHER_INTERPRETER")
}

pub fn agent_module() -> Option<String> {
    non_empty("TETHER_AGENT_MODULE")
}

pub fn agent_dir() -> Option<PathBuf> {
    non_empty("TETHER_AGENT_DIR").map(PathBuf::from)
}

pub fn stop_timeout() -> Option<Duration> {
    parse_duration_ms("TETHER_STOP_TIMEOUT_MS")
}

pub fn command_timeout() -> Option<Duration> {
    parse_duration_ms("TETHER_COMMAND_TIMEOUT_MS")
}

pub fn log_capacity() -> Option<usize> {
    std::env::var("TETHER_LOG_CAPACITY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Accepts `1/true/yes/on` and `0/false/no/off`; anything else is ignored.
pub fn exit_guard() -> Option<bool> {
    let value = std::env::var("TETHER_EXIT_GUARD").ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
