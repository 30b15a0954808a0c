// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How long to keep reading a child's pipes after it exits (default: 2000ms).
///
/// Background helpers that inherited the pipes can hold them open forever.
pub fn drain_timeout() -> Duration {
    parse_duration_ms("TETHER_DRAIN_TIMEOUT_MS").unwrap_or(Duration::from_secs(2))
}

/// Per-candidate budget for interpreter `--version` probes (default: 5000ms).
pub fn probe_timeout() -> Duration {
    parse_duration_ms("TETHER_PROBE_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}
