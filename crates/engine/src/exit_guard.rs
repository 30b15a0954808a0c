// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns requests to terminate the host into advisory events

use crate::event_hub::EventHub;
use tether_core::BridgeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// The attempt was reported as `host:exit-attempt` and must be ignored
    Suppressed,
    /// The host should go ahead and exit
    Proceed,
}

#[derive(Debug, Clone)]
pub struct ExitGuard {
    hub: EventHub,
    enabled: bool,
}

impl ExitGuard {
    pub fn new(hub: EventHub, enabled: bool) -> Self {
        Self { hub, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Decide what to do with an attempt to exit with `code`.
    pub fn intercept(&self, code: i32) -> ExitDecision {
        if !self.enabled {
            return ExitDecision::Proceed;
        }
        tracing::warn!(code, "exit attempt suppressed");
        self.hub.emit(&BridgeEvent::ExitAttempt { code });
        ExitDecision::Suppressed
    }
}

#[cfg(test)]
#[path = "exit_guard_tests.rs"]
mod tests;
