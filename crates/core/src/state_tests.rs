// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle     = { SupervisorState::Idle,     false },
    starting = { SupervisorState::Starting, true },
    running  = { SupervisorState::Running,  true },
    stopping = { SupervisorState::Stopping, true },
    stopped  = { SupervisorState::Stopped,  false },
)]
fn has_process(state: SupervisorState, expected: bool) {
    assert_eq!(state.has_process(), expected);
}

#[test]
fn state_serializes_snake_case() {
    let json = serde_json::to_string(&SupervisorState::Stopping).unwrap();
    assert_eq!(json, r#""stopping""#);
}

#[test]
fn not_running_status_omits_pid_and_uptime() {
    let status = AgentStatus::not_running(SupervisorState::Stopped);
    let json = serde_json::to_string(&status).unwrap();
    assert_eq!(json, r#"{"running":false,"state":"stopped"}"#);
}

#[test]
fn running_status_roundtrip() {
    let status = AgentStatus {
        running: true,
        state: SupervisorState::Running,
        pid: Some(4242),
        uptime_ms: Some(1500),
    };
    let json = serde_json::to_string(&status).unwrap();
    let parsed: AgentStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, status);
}
