// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! How the agent is launched and how the supervisor bounds it

use std::path::PathBuf;
use std::time::Duration;
use tether_adapters::SpawnConfig;
use tether_core::{CommandRequest, DEFAULT_LOG_CAPACITY};

/// Grace period between the terminate and kill signals.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Safety net for one-shot commands (10 minutes).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Per-stream cap on what a one-shot command keeps for its result (8 MiB).
///
/// Keeps a result well inside the IPC message limit even after JSON escaping.
pub const DEFAULT_COMMAND_OUTPUT_LIMIT: usize = 8 * 1024 * 1024;

/// Module run by `<interpreter> -m` when none is configured.
pub const DEFAULT_AGENT_MODULE: &str = "itak.cli.cli";

/// Environment every supervised child receives. Applied last so it cannot be overridden.
pub const SUPERVISED_ENV: &[(&str, &str)] = &[("PYTHONUNBUFFERED", "1"), ("TETHER_SUPERVISED", "1")];

/// The agent's invocation contract: `<program> <base_args...> [args...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub base_args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// `<interpreter> -m <module>` run from `cwd`.
    pub fn python_module(
        interpreter: impl Into<String>,
        module: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self::new(interpreter)
            .base_args(["-m".to_string(), module.into()])
            .cwd(cwd)
    }

    pub fn base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Long-running interactive invocation.
    pub(crate) fn agent_config(&self) -> SpawnConfig {
        self.build(&[], None, &[])
    }

    /// One-shot invocation with the request's arguments and overrides.
    pub(crate) fn command_config(&self, request: &CommandRequest) -> SpawnConfig {
        self.build(&request.args, request.cwd.as_ref(), &request.env)
    }

    fn build(
        &self,
        args: &[String],
        cwd: Option<&PathBuf>,
        env: &[(String, String)],
    ) -> SpawnConfig {
        let mut config = SpawnConfig::new(&self.program)
            .args(self.base_args.iter().cloned())
            .args(args.iter().cloned());
        config.cwd = cwd.or(self.cwd.as_ref()).cloned();
        config.env.extend(self.env.iter().cloned());
        config.env.extend(env.iter().cloned());
        config.env.extend(
            SUPERVISED_ENV
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        config
    }
}

/// Supervisor tuning
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub launch: LaunchSpec,
    pub stop_timeout: Duration,
    pub log_capacity: usize,
    pub command_timeout: Duration,
    pub command_output_limit: usize,
}

impl SupervisorConfig {
    pub fn new(launch: LaunchSpec) -> Self {
        Self {
            launch,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            command_output_limit: DEFAULT_COMMAND_OUTPUT_LIMIT,
        }
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn command_output_limit(mut self, bytes: usize) -> Self {
        self.command_output_limit = bytes;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
