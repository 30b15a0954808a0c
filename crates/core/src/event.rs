// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events pushed from the supervisor to its observers

use crate::log::StreamTag;
use crate::state::SupervisorState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a child process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    /// Exit code when the process exited normally
    pub code: Option<i32>,
    /// Signal name (e.g. `SIGKILL`) when the process was killed by a signal
    pub signal: Option<String>,
}

impl ExitInfo {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.signal) {
            (Some(code), _) => write!(f, "code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Events delivered to bridge subscribers.
///
/// Serializes with `{"type": "agent:log", ...fields}` format so the same
/// shape is used on the socket and by in-process listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// A chunk of long-running agent output
    #[serde(rename = "agent:log")]
    Log { stream: StreamTag, data: String },

    #[serde(rename = "agent:state")]
    AgentState {
        state: SupervisorState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },

    /// The long-running agent exited, for any reason
    #[serde(rename = "agent:stopped")]
    AgentStopped {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<String>,
    },

    /// Spawn or monitoring failure
    #[serde(rename = "agent:error")]
    AgentError { message: String },

    /// Incremental stdout of a one-shot command
    #[serde(rename = "command:output")]
    CommandOutput { text: String },

    /// Incremental stderr of a one-shot command
    #[serde(rename = "command:error")]
    CommandError { text: String },

    /// The host tried to terminate and was stopped by the exit guard
    #[serde(rename = "host:exit-attempt")]
    ExitAttempt { code: i32 },
}

/// Discriminant of [`BridgeEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Log,
    AgentState,
    AgentStopped,
    AgentError,
    CommandOutput,
    CommandError,
    ExitAttempt,
}

impl BridgeEvent {
    pub fn log(stream: StreamTag, data: impl Into<String>) -> Self {
        BridgeEvent::Log {
            stream,
            data: data.into(),
        }
    }

    pub fn stopped(exit: &ExitInfo) -> Self {
        BridgeEvent::AgentStopped {
            exit_code: exit.code,
            signal: exit.signal.clone(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::Log { .. } => EventKind::Log,
            BridgeEvent::AgentState { .. } => EventKind::AgentState,
            BridgeEvent::AgentStopped { .. } => EventKind::AgentStopped,
            BridgeEvent::AgentError { .. } => EventKind::AgentError,
            BridgeEvent::CommandOutput { .. } => EventKind::CommandOutput,
            BridgeEvent::CommandError { .. } => EventKind::CommandError,
            BridgeEvent::ExitAttempt { .. } => EventKind::ExitAttempt,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Log { .. } => "agent:log",
            BridgeEvent::AgentState { .. } => "agent:state",
            BridgeEvent::AgentStopped { .. } => "agent:stopped",
            BridgeEvent::AgentError { .. } => "agent:error",
            BridgeEvent::CommandOutput { .. } => "command:output",
            BridgeEvent::CommandError { .. } => "command:error",
            BridgeEvent::ExitAttempt { .. } => "host:exit-attempt",
        }
    }

    /// One-line description for tracing, without payload text.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            BridgeEvent::Log { stream, data } => format!("{t} stream={stream} len={}", data.len()),
            BridgeEvent::AgentState { state, pid } => match pid {
                Some(pid) => format!("{t} state={state} pid={pid}"),
                None => format!("{t} state={state}"),
            },
            BridgeEvent::AgentStopped { exit_code, signal } => match (exit_code, signal) {
                (Some(code), _) => format!("{t} code={code}"),
                (None, Some(signal)) => format!("{t} signal={signal}"),
                (None, None) => t.to_string(),
            },
            BridgeEvent::AgentError { message } => format!("{t} error={message}"),
            BridgeEvent::CommandOutput { text } | BridgeEvent::CommandError { text } => {
                format!("{t} len={}", text.len())
            }
            BridgeEvent::ExitAttempt { code } => format!("{t} code={code}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
