// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    cleanup_stale_socket, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, wrap_with_startup_error,
};

use tether_core::{AgentStatus, BridgeEvent, BridgeResult, CommandResult, LogLine};
use tether_daemon::protocol::{self, ProtocolError};
use tether_daemon::{Request, Response, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

/// Timeout for short IPC requests (hello, status, input, logs)
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Daemon defaults for `TETHER_STOP_TIMEOUT_MS` and `TETHER_COMMAND_TIMEOUT_MS`
const DAEMON_STOP_TIMEOUT: Duration = Duration::from_secs(5);
const DAEMON_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Headroom over the daemon's limits for output drain and IPC
const STOP_MARGIN: Duration = Duration::from_secs(25);
const RUN_MARGIN: Duration = Duration::from_secs(55);

/// Timeout for `StopAgent`, which waits out the daemon's own escalation.
///
/// Follows the daemon's grace period when it is set through the environment.
/// A grace period set only in `config.toml` is not visible here; raise
/// `TETHER_TIMEOUT_STOP_MS` to match.
pub fn timeout_stop() -> Duration {
    crate::env::timeout_stop_ms().unwrap_or_else(|| {
        crate::env::daemon_stop_timeout().unwrap_or(DAEMON_STOP_TIMEOUT) + STOP_MARGIN
    })
}

/// Timeout for `RunCommand`; outlasts the daemon's command timeout plus its
/// kill escalation. Same `config.toml` caveat as [`timeout_stop`].
pub fn timeout_run() -> Duration {
    crate::env::timeout_run_ms().unwrap_or_else(|| {
        crate::env::daemon_command_timeout().unwrap_or(DAEMON_COMMAND_TIMEOUT)
            + crate::env::daemon_stop_timeout().unwrap_or(DAEMON_STOP_TIMEOUT)
            + RUN_MARGIN
    })
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    /// True when the error means "nothing is listening", as opposed to a
    /// daemon that answered badly.
    pub fn is_not_running(&self) -> bool {
        match self {
            ClientError::DaemonNotRunning => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands - auto-start the daemon if it is not running
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start()
    }

    /// For query commands - connect only
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // Verify the socket is actually accepting connections
                // (daemon may have crashed, leaving a stale socket file)
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    #[cfg(test)]
    pub(crate) fn at(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                Ok(_) | Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, request, write_timeout).await?;
        let response = protocol::read_response(&mut reader, read_timeout).await?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_for(request, timeout_ipc()).await
    }

    async fn send_for(&self, request: &Request, read_timeout: Duration) -> Result<Response, ClientError> {
        match self
            .send_with_timeout(request, read_timeout, timeout_ipc())
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    /// Health check
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub async fn start_agent(&self) -> Result<BridgeResult, ClientError> {
        match self.send(&Request::StartAgent).await? {
            Response::Result { result } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    pub async fn stop_agent(&self) -> Result<BridgeResult, ClientError> {
        match self.send_for(&Request::StopAgent, timeout_stop()).await? {
            Response::Result { result } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    /// Run a one-shot agent invocation and wait for it to finish
    pub async fn run_command(&self, args: Vec<String>) -> Result<CommandResult, ClientError> {
        let request = Request::RunCommand { args };
        match self.send_for(&request, timeout_run()).await? {
            Response::Command { result } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&self) -> Result<AgentStatus, ClientError> {
        match self.send(&Request::GetStatus).await? {
            Response::Status { status } => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// Returns whether the daemon accepted the input for delivery
    pub async fn send_input(&self, text: &str) -> Result<bool, ClientError> {
        let request = Request::SendInput {
            text: text.to_string(),
        };
        match self.send(&request).await? {
            Response::InputAccepted { accepted } => Ok(accepted),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_logs(&self) -> Result<Vec<LogLine>, ClientError> {
        match self.send(&Request::GetLogs).await? {
            Response::Logs { lines } => Ok(lines),
            other => Err(unexpected(other)),
        }
    }

    pub async fn clear_logs(&self) -> Result<BridgeResult, ClientError> {
        match self.send(&Request::ClearLogs).await? {
            Response::Result { result } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    /// Open a push stream of bridge events
    pub async fn subscribe(&self) -> Result<EventStream, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();
        protocol::write_request(&mut writer, &Request::Subscribe, timeout_ipc()).await?;
        match protocol::read_response(&mut reader, timeout_ipc()).await? {
            Response::Subscribed => Ok(EventStream {
                reader,
                _writer: writer,
            }),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Events pushed by the daemon on a subscribed connection.
pub struct EventStream {
    reader: OwnedReadHalf,
    // Dropping the write half signals EOF to the daemon
    _writer: OwnedWriteHalf,
}

impl EventStream {
    /// Next event, or `None` once the daemon closes the connection.
    pub async fn next(&mut self) -> Result<Option<BridgeEvent>, ClientError> {
        let bytes = match protocol::read_message(&mut self.reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match protocol::decode::<Response>(&bytes)? {
            Response::Event { event } => Ok(Some(event)),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
