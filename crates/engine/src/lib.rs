// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tether supervision engine

pub mod bridge;
pub mod config;
mod error;
pub mod escalation;
pub mod event_hub;
mod exit_guard;
mod supervisor;

pub use bridge::{Bridge, BridgeError};
pub use config::{LaunchSpec, SupervisorConfig, DEFAULT_AGENT_MODULE};
pub use error::SupervisorError;
pub use escalation::{escalate, Escalation};
pub use event_hub::{EventHub, Subscription};
pub use exit_guard::{ExitDecision, ExitGuard};
pub use supervisor::Supervisor;
