// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;
use tether_core::{format_uptime_ms, AgentStatus, BridgeEvent, BridgeResult, LogLine, StreamTag};

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a lifecycle result; failures become an error for the caller.
pub fn print_bridge_result(result: &BridgeResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if result.success {
                println!("{}", result.output);
            }
        }
        OutputFormat::Json => print_json(result)?,
    }
    if !result.success {
        let message = result.error.as_deref().unwrap_or("request failed");
        return Err(crate::exit_error::ExitError::new(1, message).into());
    }
    Ok(())
}

/// Render the agent status block shown by `tether status`.
pub fn format_status(status: &AgentStatus) -> String {
    let mut out = format!("Agent: {}", status.state);
    if let Some(pid) = status.pid {
        out.push_str(&format!("\nPid: {}", pid));
    }
    if let Some(uptime) = status.uptime_ms {
        out.push_str(&format!("\nUptime: {}", format_uptime_ms(uptime)));
    }
    out
}

/// Render a buffered log line as `[stream +uptime] text`.
///
/// Chunks keep their own newlines; one is added only when missing.
pub fn format_log_line(line: &LogLine) -> String {
    let mut out = format!(
        "[{} +{}] {}",
        line.stream,
        format_uptime_ms(line.timestamp_ms),
        line.text
    );
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Where a streamed event goes in text mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutput {
    Stdout(String),
    Stderr(String),
}

/// Render a pushed event for `tether watch`.
///
/// Process output is passed through untouched so the agent's own framing
/// survives; everything else becomes a one-line note on stderr.
pub fn format_event(event: &BridgeEvent) -> EventOutput {
    match event {
        BridgeEvent::Log { stream, data } => match stream {
            StreamTag::Stdout => EventOutput::Stdout(data.clone()),
            StreamTag::Stderr => EventOutput::Stderr(data.clone()),
            other => EventOutput::Stderr(format!("[{}] {}\n", other, data.trim_end())),
        },
        BridgeEvent::CommandOutput { text } => EventOutput::Stdout(text.clone()),
        BridgeEvent::CommandError { text } => EventOutput::Stderr(text.clone()),
        BridgeEvent::AgentState { state, pid } => match pid {
            Some(pid) => EventOutput::Stderr(format!("[tether] agent {} (pid {})\n", state, pid)),
            None => EventOutput::Stderr(format!("[tether] agent {}\n", state)),
        },
        BridgeEvent::AgentStopped { exit_code, signal } => {
            let how = match (exit_code, signal) {
                (Some(code), _) => format!("code {}", code),
                (None, Some(signal)) => format!("signal {}", signal),
                (None, None) => "unknown status".to_string(),
            };
            EventOutput::Stderr(format!("[tether] agent stopped ({})\n", how))
        }
        BridgeEvent::AgentError { message } => {
            EventOutput::Stderr(format!("[tether] agent error: {}\n", message))
        }
        BridgeEvent::ExitAttempt { code } => {
            EventOutput::Stderr(format!("[tether] exit attempt suppressed (code {})\n", code))
        }
    }
}
