// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Each connection carries one request and one response, except
//! `Subscribe`, which keeps the connection open and pushes events until
//! the client hangs up.

use tether_core::CommandResult;
use thiserror::Error;
use tether_engine::Bridge;
use tokio::io::AsyncReadExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tether_daemon::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    bridge: Bridge,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Listener {
    pub fn new(socket: UnixListener, bridge: Bridge) -> Self {
        Self { socket, bridge }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let bridge = self.bridge.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, bridge).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, bridge: Bridge) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Status and log polling is frequent; keep it out of the info log
    if matches!(request, Request::GetStatus | Request::GetLogs | Request::Ping) {
        debug!(request = request.name(), "received request");
    } else {
        info!(request = request.name(), "received request");
    }

    if matches!(request, Request::Subscribe) {
        return stream_events(reader, writer, bridge).await;
    }

    let response = handle_request(request, &bridge).await;
    debug!(response = response.name(), "sending response");
    let data = encode_response(response)?;
    tokio::time::timeout(DEFAULT_TIMEOUT, protocol::write_message(&mut writer, &data))
        .await
        .map_err(|_| protocol::ProtocolError::Timeout)??;

    Ok(())
}

/// Encode a response, replacing one that exceeds the message limit with a
/// failure the client can display.
fn encode_response(response: Response) -> Result<Vec<u8>, protocol::ProtocolError> {
    let (size, max) = match protocol::encode(&response) {
        Err(protocol::ProtocolError::MessageTooLarge { size, max }) => (size, max),
        other => return other,
    };
    warn!(response = response.name(), size, max, "response too large for the wire");
    let message = format!("output too large: {} bytes (max {})", size, max);
    let replacement = match response {
        Response::Command { .. } => Response::Command {
            result: CommandResult::spawn_failed(message),
        },
        _ => Response::Error { message },
    };
    protocol::encode(&replacement)
}

/// Map a request onto the bridge. Every request has exactly one bridge call.
async fn handle_request(request: Request, bridge: &Bridge) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, daemon = PROTOCOL_VERSION, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::StartAgent => Response::Result {
            result: bridge.start_agent(),
        },

        Request::StopAgent => Response::Result {
            result: bridge.stop_agent().await,
        },

        Request::RunCommand { args } => Response::Command {
            result: bridge.run_command(args).await,
        },

        Request::GetStatus => Response::Status {
            status: bridge.get_status(),
        },

        Request::SendInput { text } => Response::InputAccepted {
            accepted: bridge.send_input(&text),
        },

        Request::GetLogs => Response::Logs {
            lines: bridge.get_logs(),
        },

        Request::ClearLogs => Response::Result {
            result: bridge.clear_logs(),
        },

        // Handled before dispatch; a second subscribe is meaningless
        Request::Subscribe => Response::Error {
            message: "already subscribed".to_string(),
        },
    }
}

/// Forward bridge events to the client until either side goes away.
async fn stream_events(
    mut reader: tokio::net::unix::OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    bridge: Bridge,
) -> Result<(), ConnectionError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = bridge.on_event(move |event| {
        let _ = tx.send(event.clone());
    });

    protocol::write_response(&mut writer, &Response::Subscribed, DEFAULT_TIMEOUT).await?;

    let mut probe = [0u8; 64];
    let result = loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break Ok(()) };
                let response = Response::Event { event };
                if let Err(e) = protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await {
                    break Err(e.into());
                }
            }
            // Subscribers never send after subscribing; EOF means they left
            read = reader.read(&mut probe) => {
                match read {
                    Ok(0) => break Ok(()),
                    Ok(_) => continue,
                    Err(e) => break Err(e.into()),
                }
            }
        }
    };

    subscription.unsubscribe();
    debug!("Subscriber disconnected");
    result
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
