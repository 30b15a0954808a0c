// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervisor

use tether_adapters::ProcessError;
use thiserror::Error;

/// Errors from supervisor lifecycle operations
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Agent already running")]
    AlreadyRunning,
    #[error("No agent running")]
    NotRunning,
    #[error(transparent)]
    Spawn(#[from] ProcessError),
    #[error("agent monitor ended before the exit was observed")]
    MonitorLost,
}
