// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful-then-forced shutdown of one child

use std::time::Duration;
use tether_adapters::{ProcessError, ProcessHandle, Signal};
use tether_core::ExitInfo;
use tracing::Instrument;

/// How an escalated stop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub exit: ExitInfo,
    /// The grace period elapsed and the group was killed
    pub forced: bool,
}

/// Terminate the child's group, wait up to `grace`, then kill it.
///
/// The grace period covers the child itself; helpers still holding its
/// output open do not count against it. Returns once the child is reaped.
pub async fn escalate(handle: &ProcessHandle, grace: Duration) -> Escalation {
    let pid = handle.pid();
    async {
        send(handle, Signal::Terminate);
        if let Ok(exit) = tokio::time::timeout(grace, handle.wait_reaped()).await {
            tracing::info!(exit = %exit, "stopped gracefully");
            return Escalation { exit, forced: false };
        }

        tracing::warn!(grace_ms = grace.as_millis() as u64, "grace period elapsed, killing");
        send(handle, Signal::Kill);
        let exit = handle.wait_reaped().await;
        tracing::info!(exit = %exit, "killed");
        Escalation { exit, forced: true }
    }
    .instrument(tracing::info_span!("escalate", pid))
    .await
}

fn send(handle: &ProcessHandle, signal: Signal) {
    match handle.signal(signal) {
        Ok(()) | Err(ProcessError::NotRunning) => {}
        Err(e) => tracing::error!(?signal, error = %e, "signal failed"),
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
