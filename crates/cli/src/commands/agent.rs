// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle, one-shot commands, input and logs

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::{format_log_line, format_status, print_bridge_result, print_json, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Arguments passed to the agent entry point, verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct SendArgs {
    /// Text to write to the agent's stdin; a line terminator is added
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct LogsArgs {
    /// Show only the last N lines
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

pub async fn start(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.start_agent().await?;
    print_bridge_result(&result, format)
}

pub async fn stop(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.stop_agent().await?;
    print_bridge_result(&result, format)
}

/// Run a one-shot command; the CLI exits with the command's exit code.
pub async fn run(args: RunArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.run_command(args.args).await?;

    match format {
        OutputFormat::Text => {
            print!("{}", result.output);
            if !result.success {
                if let Some(error) = &result.error {
                    eprint!("{}", error);
                    if !error.ends_with('\n') {
                        eprintln!();
                    }
                }
            }
        }
        OutputFormat::Json => print_json(&result)?,
    }

    if result.success {
        Ok(())
    } else {
        let code = result.exit_code.filter(|c| *c != 0).unwrap_or(1);
        Err(ExitError::new(code, "").into())
    }
}

pub async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;
    match format {
        OutputFormat::Text => println!("{}", format_status(&status)),
        OutputFormat::Json => print_json(&status)?,
    }
    Ok(())
}

pub async fn send(args: SendArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let text = args.text.join(" ");
    let accepted = client.send_input(&text).await?;
    if format == OutputFormat::Json {
        print_json(&serde_json::json!({ "accepted": accepted }))?;
    }
    if !accepted {
        return Err(ExitError::new(1, "input not accepted (is the agent running?)").into());
    }
    Ok(())
}

pub async fn logs(args: LogsArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let mut lines = client.get_logs().await?;
    if let Some(limit) = args.limit {
        let skip = lines.len().saturating_sub(limit);
        lines.drain(..skip);
    }

    match format {
        OutputFormat::Text => {
            for line in &lines {
                print!("{}", format_log_line(line));
            }
        }
        OutputFormat::Json => print_json(&lines)?,
    }
    Ok(())
}

pub async fn clear_logs(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.clear_logs().await?;
    print_bridge_result(&result, format)
}
