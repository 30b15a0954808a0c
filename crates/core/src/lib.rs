// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-core: plain data shared by the supervisor, the relay, and clients

pub mod clock;
pub mod command;
pub mod event;
pub mod log;
pub mod ring_buffer;
pub mod state;
pub mod time_fmt;

pub use clock::{Clock, SystemClock};
pub use command::{BridgeResult, CommandRequest, CommandResult};
pub use event::{BridgeEvent, EventKind, ExitInfo};
pub use log::{LogLine, StreamTag};
pub use ring_buffer::{OutputRingBuffer, DEFAULT_LOG_CAPACITY};
pub use state::{AgentStatus, SupervisorState};
pub use time_fmt::{format_uptime, format_uptime_ms};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
