// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether watch` - follow bridge events live

use std::io::Write;

use anyhow::Result;
use tokio::signal::unix::{signal, SignalKind};

use crate::client::DaemonClient;
use crate::output::{format_event, EventOutput, OutputFormat};

pub async fn watch(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let mut events = client.subscribe().await?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        let event = tokio::select! {
            next = events.next() => next?,
            _ = sigint.recv() => break,
        };
        let Some(event) = event else {
            eprintln!("[tether] daemon closed the connection");
            break;
        };

        match format {
            // One JSON object per line so the stream can be piped
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
            OutputFormat::Text => match format_event(&event) {
                EventOutput::Stdout(text) => {
                    let mut out = std::io::stdout().lock();
                    out.write_all(text.as_bytes())?;
                    out.flush()?;
                }
                EventOutput::Stderr(text) => {
                    let mut err = std::io::stderr().lock();
                    err.write_all(text.as_bytes())?;
                    err.flush()?;
                }
            },
        }
    }
    Ok(())
}
