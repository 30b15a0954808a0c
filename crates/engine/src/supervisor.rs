// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance supervision of the long-running agent.
//!
//! All state mutations happen under one lock and events are emitted after
//! it is released, so listeners may call back into the supervisor.

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::escalation::escalate;
use crate::event_hub::EventHub;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tether_adapters::{ProcessEvent, ProcessHandle};
use tether_core::{
    AgentStatus, BridgeEvent, Clock, CommandRequest, CommandResult, ExitInfo, LogLine,
    OutputRingBuffer, StreamTag, SupervisorState, SystemClock,
};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

struct Agent {
    handle: Arc<ProcessHandle>,
    started_at: Instant,
    /// Set once the monitor has recorded the exit and emitted its events
    settled: watch::Receiver<Option<ExitInfo>>,
}

struct Slot {
    state: SupervisorState,
    generation: u64,
    agent: Option<Agent>,
}

struct Inner<C: Clock> {
    config: SupervisorConfig,
    clock: C,
    origin: Instant,
    hub: EventHub,
    slot: Mutex<Slot>,
    logs: Mutex<OutputRingBuffer<LogLine>>,
}

/// Owns zero or one long-running agent plus any number of one-shot commands.
pub struct Supervisor<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Supervisor<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Supervisor<SystemClock> {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(config: SupervisorConfig, clock: C) -> Self {
        let origin = clock.now();
        let logs = OutputRingBuffer::new(config.log_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                origin,
                hub: EventHub::new(),
                slot: Mutex::new(Slot {
                    state: SupervisorState::Idle,
                    generation: 0,
                    agent: None,
                }),
                logs: Mutex::new(logs),
            }),
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.hub
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Launch the agent in interactive mode.
    ///
    /// Success means the OS accepted the launch, not that the agent is ready.
    /// Must be called from within a tokio runtime.
    pub fn start_agent(&self) -> Result<u32, SupervisorError> {
        let mut slot = self.inner.slot.lock();
        if slot.state.has_process() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let config = self.inner.config.launch.agent_config();
        let (handle, events) = match ProcessHandle::spawn(config) {
            Ok(spawned) => spawned,
            Err(e) => {
                drop(slot);
                tracing::error!(error = %e, "failed to start agent");
                self.record(StreamTag::Error, format!("failed to start agent: {}", e));
                self.inner.hub.emit(&BridgeEvent::AgentError {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let pid = handle.pid();
        slot.generation += 1;
        let generation = slot.generation;
        let (settled_tx, settled_rx) = watch::channel(None);
        slot.agent = Some(Agent {
            handle: Arc::new(handle),
            started_at: self.inner.clock.now(),
            settled: settled_rx,
        });
        slot.state = SupervisorState::Running;
        drop(slot);

        tracing::info!(pid, generation, "agent started");
        self.record(StreamTag::Info, format!("agent started (pid {})", pid));
        // Spawning happens under the slot lock, so `Starting` is never observable
        self.inner.hub.emit(&BridgeEvent::AgentState {
            state: SupervisorState::Running,
            pid: Some(pid),
        });

        let this = self.clone();
        tokio::spawn(
            async move { this.monitor(generation, events, settled_tx).await }
                .instrument(tracing::info_span!("agent", pid)),
        );
        Ok(pid)
    }

    /// Forward the agent's events until it exits, then settle the slot.
    async fn monitor(
        self,
        generation: u64,
        mut events: mpsc::Receiver<ProcessEvent>,
        settled: watch::Sender<Option<ExitInfo>>,
    ) {
        let mut exit = None;
        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Output { stream, text } => {
                    self.record(stream, text.clone());
                    self.inner.hub.emit(&BridgeEvent::log(stream, text));
                }
                ProcessEvent::Failed(message) => {
                    self.record(StreamTag::Error, message.clone());
                    self.inner.hub.emit(&BridgeEvent::AgentError { message });
                }
                ProcessEvent::Exited(info) => {
                    exit = Some(info);
                    break;
                }
            }
        }
        let exit = match exit {
            Some(exit) => exit,
            None => {
                tracing::error!("event stream ended without an exit");
                ExitInfo::default()
            }
        };

        {
            let mut slot = self.inner.slot.lock();
            if slot.generation == generation {
                slot.agent = None;
                slot.state = SupervisorState::Stopped;
            }
        }

        tracing::info!(exit = %exit, "agent exited");
        self.record(StreamTag::Info, format!("agent exited: {}", exit));
        self.inner.hub.emit(&BridgeEvent::AgentState {
            state: SupervisorState::Stopped,
            pid: None,
        });
        self.inner.hub.emit(&BridgeEvent::stopped(&exit));
        let _ = settled.send(Some(exit));
    }

    /// Stop the agent, escalating to a kill after the grace period.
    ///
    /// Resolves only once the exit has been observed. Concurrent callers
    /// share the same stop sequence and exit.
    pub async fn stop_agent(&self) -> Result<ExitInfo, SupervisorError> {
        let (handle, mut settled, initiate) = {
            let mut slot = self.inner.slot.lock();
            let Some(agent) = slot.agent.as_ref() else {
                return Err(SupervisorError::NotRunning);
            };
            let handle = Arc::clone(&agent.handle);
            let settled = agent.settled.clone();
            let initiate = slot.state != SupervisorState::Stopping;
            if initiate {
                slot.state = SupervisorState::Stopping;
            }
            (handle, settled, initiate)
        };

        if initiate {
            let pid = handle.pid();
            tracing::info!(pid, "stopping agent");
            self.inner.hub.emit(&BridgeEvent::AgentState {
                state: SupervisorState::Stopping,
                pid: Some(pid),
            });
            // Detached so a cancelled caller cannot abandon the escalation
            let grace = self.inner.config.stop_timeout;
            tokio::spawn(async move {
                let outcome = escalate(&handle, grace).await;
                if outcome.forced {
                    tracing::warn!(pid, "agent ignored terminate, killed");
                } else {
                    tracing::info!(pid, "agent stopped");
                }
            });
        }

        let exit = settled.wait_for(Option::is_some).await;
        match exit {
            Ok(exit) => Ok(exit.clone().unwrap_or_default()),
            Err(_) => Err(SupervisorError::MonitorLost),
        }
    }

    /// Run the agent once with `request.args` and collect its output.
    ///
    /// Independent of the supervised instance; any number may run at once.
    pub async fn run_command(&self, request: CommandRequest) -> CommandResult {
        let config = self.inner.config.launch.command_config(&request);
        let (handle, mut events) = match ProcessHandle::spawn(config) {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::warn!(error = %e, "command spawn failed");
                return CommandResult::spawn_failed(e.to_string());
            }
        };
        handle.close_stdin();
        let handle = Arc::new(handle);
        let pid = handle.pid();
        tracing::debug!(pid, args = request.args.len(), "command started");

        let timeout = self.inner.config.command_timeout;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let limit = self.inner.config.command_output_limit;
        let mut stdout = CappedText::default();
        let mut stderr = CappedText::default();
        let mut timed_out = false;
        let mut exit = None;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ProcessEvent::Output { stream: StreamTag::Stdout, text }) => {
                        stdout.push(&text, limit);
                        self.inner.hub.emit(&BridgeEvent::CommandOutput { text });
                    }
                    Some(ProcessEvent::Output { text, .. }) => {
                        stderr.push(&text, limit);
                        self.inner.hub.emit(&BridgeEvent::CommandError { text });
                    }
                    Some(ProcessEvent::Failed(message)) => {
                        tracing::warn!(pid, %message, "command wait failed");
                    }
                    Some(ProcessEvent::Exited(info)) => {
                        exit = Some(info);
                        break;
                    }
                    None => break,
                },
                _ = &mut deadline, if !timed_out => {
                    timed_out = true;
                    tracing::warn!(pid, timeout_ms = timeout.as_millis() as u64, "command timed out");
                    let handle = Arc::clone(&handle);
                    let grace = self.inner.config.stop_timeout;
                    tokio::spawn(async move {
                        let outcome = escalate(&handle, grace).await;
                        tracing::info!(pid, forced = outcome.forced, "timed out command stopped");
                    });
                }
            }
        }

        if stdout.truncated || stderr.truncated {
            tracing::warn!(pid, limit, "command output truncated");
        }
        let stdout = stdout.finish(limit);
        let stderr = stderr.finish(limit);
        let exit = exit.unwrap_or_default();
        let success = !timed_out && exit.success();
        let error = if timed_out {
            Some(format!("command timed out after {:?}", timeout))
        } else if success {
            None
        } else if stderr.is_empty() {
            Some(format!("process exited with {}", exit))
        } else {
            Some(stderr)
        };
        tracing::debug!(pid, success, exit = %exit, "command finished");
        CommandResult {
            success,
            output: stdout,
            error,
            exit_code: exit.code,
        }
    }

    /// Write `text` plus a newline to the agent's stdin.
    ///
    /// Best-effort: returns false when there is no agent or the pipe is closed.
    pub fn send_input(&self, text: &str) -> bool {
        let handle = {
            let slot = self.inner.slot.lock();
            slot.agent.as_ref().map(|a| Arc::clone(&a.handle))
        };
        let Some(handle) = handle else {
            return false;
        };
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        match handle.write(line) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(pid = handle.pid(), error = %e, "input dropped");
                false
            }
        }
    }

    pub fn get_status(&self) -> AgentStatus {
        let slot = self.inner.slot.lock();
        match &slot.agent {
            Some(agent) => AgentStatus {
                running: true,
                state: slot.state,
                pid: Some(agent.handle.pid()),
                uptime_ms: Some(
                    self.inner
                        .clock
                        .now()
                        .saturating_duration_since(agent.started_at)
                        .as_millis() as u64,
                ),
            },
            None => AgentStatus::not_running(slot.state),
        }
    }

    pub fn get_logs(&self) -> Vec<LogLine> {
        self.inner.logs.lock().snapshot()
    }

    pub fn clear_logs(&self) {
        self.inner.logs.lock().clear();
    }

    /// Stop the agent if one is running. Used when the host shuts down.
    pub async fn shutdown(&self) {
        match self.stop_agent().await {
            Ok(exit) => tracing::info!(exit = %exit, "agent stopped for shutdown"),
            Err(SupervisorError::NotRunning) => {}
            Err(e) => tracing::warn!(error = %e, "agent stop during shutdown failed"),
        }
    }

    fn record(&self, stream: StreamTag, text: String) {
        let timestamp_ms = self
            .inner
            .clock
            .now()
            .saturating_duration_since(self.inner.origin)
            .as_millis() as u64;
        self.inner
            .logs
            .lock()
            .append(LogLine::new(stream, timestamp_ms, text));
    }
}

/// Output collected for a command result, bounded to a byte limit.
#[derive(Default)]
struct CappedText {
    text: String,
    truncated: bool,
}

impl CappedText {
    fn push(&mut self, chunk: &str, limit: usize) {
        if self.truncated {
            return;
        }
        let room = limit.saturating_sub(self.text.len());
        if chunk.len() <= room {
            self.text.push_str(chunk);
            return;
        }
        let mut end = room;
        while !chunk.is_char_boundary(end) {
            end -= 1;
        }
        self.text.push_str(&chunk[..end]);
        self.truncated = true;
    }

    fn finish(mut self, limit: usize) -> String {
        if self.truncated {
            self.text
                .push_str(&format!("\n[output truncated at {} bytes]\n", limit));
        }
        self.text
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
