// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the daemon and its clients.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload
//!
//! The request set mirrors the bridge API one to one. There is no request
//! that names an executable or terminates the daemon.

use serde::{Deserialize, Serialize};
use tether_core::{AgentStatus, BridgeEvent, BridgeResult, CommandResult, LogLine};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from a client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    StartAgent,

    StopAgent,

    /// One-shot agent invocation with opaque arguments
    RunCommand { args: Vec<String> },

    GetStatus,

    SendInput { text: String },

    GetLogs,

    ClearLogs,

    /// Turn this connection into a stream of `Response::Event`
    Subscribe,
}

/// Response from the daemon to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Outcome of a lifecycle operation
    Result { result: BridgeResult },

    /// Outcome of a one-shot command
    Command { result: CommandResult },

    Status { status: AgentStatus },

    InputAccepted { accepted: bool },

    Logs { lines: Vec<LogLine> },

    /// Subscription is live; events follow on this connection
    Subscribed,

    /// Pushed to subscribed connections
    Event { event: BridgeEvent },

    /// Error response
    Error { message: String },
}

impl Request {
    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Hello { .. } => "hello",
            Request::StartAgent => "start_agent",
            Request::StopAgent => "stop_agent",
            Request::RunCommand { .. } => "run_command",
            Request::GetStatus => "get_status",
            Request::SendInput { .. } => "send_input",
            Request::GetLogs => "get_logs",
            Request::ClearLogs => "clear_logs",
            Request::Subscribe => "subscribe",
        }
    }
}

impl Response {
    pub fn name(&self) -> &'static str {
        match self {
            Response::Ok => "ok",
            Response::Pong => "pong",
            Response::Hello { .. } => "hello",
            Response::Result { .. } => "result",
            Response::Command { .. } => "command",
            Response::Status { .. } => "status",
            Response::InputAccepted { .. } => "input_accepted",
            Response::Logs { .. } => "logs",
            Response::Subscribed => "subscribed",
            Response::Event { .. } => "event",
            Response::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
