// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability-restricted facade over the supervisor.
//!
//! This is the only surface handed to the unprivileged side. Arguments are
//! plain strings; results are plain data. Nothing here accepts an
//! executable path, a process handle, or a callback that runs privileged.

mod validate;

pub use validate::{BridgeError, MAX_ARGS, MAX_ARG_BYTES, MAX_INPUT_BYTES};

use crate::event_hub::Subscription;
use crate::supervisor::Supervisor;
use tether_core::{
    AgentStatus, BridgeEvent, BridgeResult, Clock, CommandRequest, CommandResult, EventKind,
    ExitInfo, LogLine, StreamTag, SupervisorState, SystemClock,
};

pub struct Bridge<C: Clock = SystemClock> {
    supervisor: Supervisor<C>,
}

impl<C: Clock> Clone for Bridge<C> {
    fn clone(&self) -> Self {
        Self {
            supervisor: self.supervisor.clone(),
        }
    }
}

impl<C: Clock> Bridge<C> {
    pub fn new(supervisor: Supervisor<C>) -> Self {
        Self { supervisor }
    }

    pub fn start_agent(&self) -> BridgeResult {
        match self.supervisor.start_agent() {
            Ok(_) => BridgeResult::ok("Agent started successfully"),
            Err(e) => BridgeResult::err(e.to_string()),
        }
    }

    pub async fn stop_agent(&self) -> BridgeResult {
        match self.supervisor.stop_agent().await {
            Ok(_) => BridgeResult::ok("Agent stopped"),
            Err(e) => BridgeResult::err(e.to_string()),
        }
    }

    pub async fn run_command(&self, args: Vec<String>) -> CommandResult {
        if let Err(e) = validate::command_args(&args) {
            tracing::warn!(error = %e, "rejected command");
            return CommandResult::rejected(e.to_string());
        }
        self.supervisor.run_command(CommandRequest::new(args)).await
    }

    pub fn get_status(&self) -> AgentStatus {
        self.supervisor.get_status()
    }

    pub fn send_input(&self, text: &str) -> bool {
        if let Err(e) = validate::input(text) {
            tracing::warn!(error = %e, "rejected input");
            return false;
        }
        self.supervisor.send_input(text)
    }

    pub fn get_logs(&self) -> Vec<LogLine> {
        self.supervisor.get_logs()
    }

    pub fn clear_logs(&self) -> BridgeResult {
        self.supervisor.clear_logs();
        BridgeResult::ok("Logs cleared")
    }

    pub fn on_log<F>(&self, f: F) -> Subscription
    where
        F: Fn(StreamTag, &str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Log, move |event| {
            if let BridgeEvent::Log { stream, data } = event {
                f(*stream, data);
            }
        })
    }

    pub fn on_agent_stopped<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ExitInfo) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::AgentStopped, move |event| {
            if let BridgeEvent::AgentStopped { exit_code, signal } = event {
                f(&ExitInfo {
                    code: *exit_code,
                    signal: signal.clone(),
                });
            }
        })
    }

    pub fn on_agent_error<F>(&self, f: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::AgentError, move |event| {
            if let BridgeEvent::AgentError { message } = event {
                f(message);
            }
        })
    }

    pub fn on_command_output<F>(&self, f: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::CommandOutput, move |event| {
            if let BridgeEvent::CommandOutput { text } = event {
                f(text);
            }
        })
    }

    pub fn on_command_error<F>(&self, f: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::CommandError, move |event| {
            if let BridgeEvent::CommandError { text } = event {
                f(text);
            }
        })
    }

    pub fn on_exit_attempt<F>(&self, f: F) -> Subscription
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::ExitAttempt, move |event| {
            if let BridgeEvent::ExitAttempt { code } = event {
                f(*code);
            }
        })
    }

    pub fn on_agent_state<F>(&self, f: F) -> Subscription
    where
        F: Fn(SupervisorState, Option<u32>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::AgentState, move |event| {
            if let BridgeEvent::AgentState { state, pid } = event {
                f(*state, *pid);
            }
        })
    }

    /// Every event, unfiltered. Used by relays that forward the raw stream.
    pub fn on_event<F>(&self, f: F) -> Subscription
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        self.supervisor.events().subscribe(f)
    }

    fn subscribe<F>(&self, kind: EventKind, f: F) -> Subscription
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        self.supervisor.events().subscribe_kind(kind, f)
    }
}

#[cfg(test)]
#[path = "../bridge_tests.rs"]
mod tests;
