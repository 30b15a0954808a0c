// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owned handle to one spawned child

use super::decode::Utf8Carry;
use super::{ProcessError, Signal, SpawnConfig};
use nix::errno::Errno;
use nix::sys::signal::killpg;
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use tether_core::{ExitInfo, StreamTag};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 8 * 1024;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observations of a running child, in the order they happened.
///
/// `Exited` is always the last event and arrives only after both output
/// streams have been drained (or the drain timeout has passed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output { stream: StreamTag, text: String },
    /// Waiting on the child failed; an `Exited` follows
    Failed(String),
    Exited(ExitInfo),
}

/// A spawned child in its own process group.
///
/// Signals go to the whole group, so helpers the child forks are stopped
/// with it.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    stdin: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    /// Set as soon as the child is reaped
    reaped_rx: watch::Receiver<Option<ExitInfo>>,
    /// Set once output has also been drained
    exit_rx: watch::Receiver<Option<ExitInfo>>,
}

impl ProcessHandle {
    /// Spawn the child and start streaming its output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: SpawnConfig,
    ) -> Result<(Self, mpsc::Receiver<ProcessEvent>), ProcessError> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: config.program.clone(),
            source,
        })?;
        let pid = child.id().ok_or(ProcessError::NotRunning)?;
        tracing::debug!(pid, program = %config.program, args = config.args.len(), "spawned child");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (reaped_tx, reaped_rx) = watch::channel(None);
        let (exit_tx, exit_rx) = watch::channel(None);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, StreamTag::Stdout, events_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, StreamTag::Stderr, events_tx.clone()));
        }
        let stdin = child.stdin.take().map(|stdin| spawn_writer(stdin, pid));

        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => exit_info_from_status(status),
                Err(e) => {
                    tracing::error!(pid, error = %e, "wait failed");
                    let _ = events_tx.send(ProcessEvent::Failed(e.to_string())).await;
                    ExitInfo::default()
                }
            };
            let _ = reaped_tx.send(Some(exit.clone()));

            let drain = crate::env::drain_timeout();
            for mut reader in readers {
                if tokio::time::timeout(drain, &mut reader).await.is_err() {
                    tracing::warn!(pid, "output still open after exit, abandoning reader");
                    reader.abort();
                    // An aborted reader may be mid-send; let it finish before `Exited`
                    let _ = reader.await;
                }
            }

            tracing::debug!(pid, exit = %exit, "child exited");
            let _ = events_tx.send(ProcessEvent::Exited(exit.clone())).await;
            let _ = exit_tx.send(Some(exit));
        });

        let handle = Self {
            pid,
            stdin: Mutex::new(stdin),
            reaped_rx,
            exit_rx,
        };
        Ok((handle, events_rx))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.reaped_rx.borrow().is_none()
    }

    /// Queue bytes for the child's stdin.
    ///
    /// Delivery is best-effort: a write that fails after being queued is
    /// logged, and later calls report the closed pipe.
    pub fn write(&self, bytes: impl Into<Vec<u8>>) -> Result<(), ProcessError> {
        if !self.is_running() {
            return Err(ProcessError::NotRunning);
        }
        let guard = self.stdin.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| ProcessError::Write("stdin closed".to_string()))?;
        tx.send(bytes.into())
            .map_err(|_| ProcessError::Write("stdin closed".to_string()))
    }

    /// Close stdin so the child sees end of input.
    pub fn close_stdin(&self) {
        self.stdin.lock().take();
    }

    /// Deliver a signal to the child's process group.
    pub fn signal(&self, signal: Signal) -> Result<(), ProcessError> {
        if !self.is_running() {
            return Err(ProcessError::NotRunning);
        }
        match killpg(Pid::from_raw(self.pid as i32), signal.as_nix()) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(ProcessError::NotRunning),
            Err(e) => Err(ProcessError::Signal(e.to_string())),
        }
    }

    /// Wait until the child has exited and its output has been drained.
    pub async fn wait(&self) -> ExitInfo {
        wait_set(self.exit_rx.clone()).await
    }

    /// Wait only until the child has been reaped.
    ///
    /// Helpers holding the output pipes open do not delay this.
    pub async fn wait_reaped(&self) -> ExitInfo {
        wait_set(self.reaped_rx.clone()).await
    }
}

async fn wait_set(mut rx: watch::Receiver<Option<ExitInfo>>) -> ExitInfo {
    let exit = match rx.wait_for(Option::is_some).await {
        Ok(exit) => exit.clone().unwrap_or_default(),
        Err(_) => ExitInfo::default(),
    };
    exit
}

fn spawn_reader<R>(mut reader: R, stream: StreamTag, tx: mpsc::Sender<ProcessEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut carry = Utf8Carry::default();
        // Keep draining after the receiver goes away so the child never blocks on a full pipe
        let mut open = true;
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let text = carry.push(&buf[..n]);
                    if open && !text.is_empty() {
                        open = tx.send(ProcessEvent::Output { stream, text }).await.is_ok();
                    }
                }
                Err(e) => {
                    tracing::warn!(%stream, error = %e, "read failed");
                    break;
                }
            }
        }
        let rest = carry.finish();
        if open && !rest.is_empty() {
            let _ = tx.send(ProcessEvent::Output { stream, text: rest }).await;
        }
    })
}

fn spawn_writer(mut stdin: ChildStdin, pid: u32) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            let result = match stdin.write_all(&bytes).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(pid, error = %e, "stdin write failed");
                break;
            }
        }
    });
    tx
}

fn exit_info_from_status(status: ExitStatus) -> ExitInfo {
    if let Some(code) = status.code() {
        return ExitInfo::code(code);
    }
    match status.signal() {
        Some(signo) => ExitInfo::signaled(signal_name(signo)),
        None => ExitInfo::default(),
    }
}

pub(crate) fn signal_name(signo: i32) -> String {
    nix::sys::signal::Signal::try_from(signo)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| format!("SIG{}", signo))
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
