// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tether daemon` - Daemon management commands

use crate::client::DaemonClient;
use crate::client_lifecycle::daemon_stop;
use crate::daemon_process::{find_tetherd_binary, read_daemon_pid};
use crate::output::{print_json, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::process::Command;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon, stopping the agent first
    Stop,
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart,
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Restart => restart().await,
        DaemonCommand::Status => status(format).await,
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(find_tetherd_binary()).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if client.ping().await.is_ok() {
            println!("Daemon already running");
            return Ok(());
        }
    }

    DaemonClient::connect_or_start().map_err(|e| anyhow!("{}", e))?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => {
            println!("Daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("Daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("Failed to stop daemon: {}", e)),
    }
}

async fn restart() -> Result<()> {
    let was_running = daemon_stop()
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        // Grace period for the OS to release the socket after exit
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    DaemonClient::connect_or_start().map_err(|e| anyhow!("{}", e))?;
    println!("Daemon restarted");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || match format {
        OutputFormat::Text => {
            println!("Daemon not running");
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" })),
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    let version = match client.hello().await {
        Ok(v) => v,
        Err(e) if e.is_not_running() => return not_running(),
        Err(e) => return Err(anyhow!("{}", e)),
    };
    let agent = client.status().await.map_err(|e| anyhow!("{}", e))?;
    let pid = read_daemon_pid().ok().flatten();

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", version);
            if let Some(pid) = pid {
                println!("Pid: {}", pid);
            }
            println!("Agent: {}", agent.state);
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "version": version,
            "pid": pid,
            "agent": agent,
        }))?,
    }

    Ok(())
}
