// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable uptime formatting.

use std::time::Duration;

/// Format an uptime as a compact two-unit string: `"42s"`, `"2m05s"`, `"1h02m"`, `"3d4h"`.
///
/// The smaller unit is zero-padded except for days, where hours are at most 23.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d{}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Milliseconds variant used by clients that receive `uptime_ms` over the wire.
pub fn format_uptime_ms(ms: u64) -> String {
    format_uptime(Duration::from_millis(ms))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
