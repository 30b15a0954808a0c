// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the supervised agent.
///
/// A process handle is associated exactly while in `Starting`, `Running`
/// or `Stopping`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Nothing has been started yet
    #[default]
    Idle,
    Starting,
    Running,
    /// Graceful signal sent, waiting for exit
    Stopping,
    /// The last agent exited (deliberately or not)
    Stopped,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
        }
    }

    /// Whether a process handle is associated with this state.
    pub fn has_process(&self) -> bool {
        matches!(
            self,
            SupervisorState::Starting | SupervisorState::Running | SupervisorState::Stopping
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the supervisor, safe to hand to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub running: bool,
    pub state: SupervisorState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Wall-clock time since the agent was started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
}

impl AgentStatus {
    pub fn not_running(state: SupervisorState) -> Self {
        Self {
            running: false,
            state,
            pid: None,
            uptime_ms: None,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
