// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured output lines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a [`LogLine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTag {
    /// Child standard output
    Stdout,
    /// Child standard error
    Stderr,
    /// Supervisor lifecycle note (start, exit)
    Info,
    /// Supervisor-side failure (spawn error, lost monitor)
    Error,
}

impl StreamTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamTag::Stdout => "stdout",
            StreamTag::Stderr => "stderr",
            StreamTag::Info => "info",
            StreamTag::Error => "error",
        }
    }

    /// True for the two streams read from the child process.
    pub fn is_process_stream(&self) -> bool {
        matches!(self, StreamTag::Stdout | StreamTag::Stderr)
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured chunk of output.
///
/// `text` is a raw chunk as delivered by the OS, not a framed line: it may
/// hold several newlines or end mid-line. `timestamp_ms` is monotonic,
/// measured from the owning supervisor's creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: StreamTag,
    pub timestamp_ms: u64,
    pub text: String,
}

impl LogLine {
    pub fn new(stream: StreamTag, timestamp_ms: u64, text: impl Into<String>) -> Self {
        Self {
            stream,
            timestamp_ms,
            text: text.into(),
        }
    }
}
