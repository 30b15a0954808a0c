// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tether - client for the agent supervisor daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod client_lifecycle;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;

use output::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{agent, daemon, watch};

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "tether",
    version,
    about = "Tether - supervise a local agent process"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the long-running agent
    Start,
    /// Stop the long-running agent
    Stop,
    /// Run a one-shot agent command and print its output
    Run(agent::RunArgs),
    /// Show agent state
    Status,
    /// Write a line to the agent's stdin
    Send(agent::SendArgs),
    /// Show buffered agent output
    Logs(agent::LogsArgs),
    /// Clear buffered agent output
    ClearLogs,
    /// Follow agent events live
    Watch,
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Dispatch with appropriate client semantics:
    // - Action commands: auto-start the daemon (never the agent)
    // - Query commands: connect only
    match command {
        Commands::Daemon(args) => daemon::daemon(args, format).await?,

        Commands::Start => agent::start(&DaemonClient::for_action()?, format).await?,
        Commands::Run(args) => agent::run(args, &DaemonClient::for_action()?, format).await?,
        Commands::Watch => watch::watch(&DaemonClient::for_action()?, format).await?,

        Commands::Stop => agent::stop(&DaemonClient::for_query()?, format).await?,
        Commands::Status => agent::status(&DaemonClient::for_query()?, format).await?,
        Commands::Send(args) => agent::send(args, &DaemonClient::for_query()?, format).await?,
        Commands::Logs(args) => agent::logs(args, &DaemonClient::for_query()?, format).await?,
        Commands::ClearLogs => agent::clear_logs(&DaemonClient::for_query()?, format).await?,
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
