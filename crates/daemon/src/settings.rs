// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings: environment > `config.toml` > defaults.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_adapters::{detect_interpreter, INTERPRETER_CANDIDATES};
use tether_core::DEFAULT_LOG_CAPACITY;
use tether_engine::{LaunchSpec, SupervisorConfig, DEFAULT_AGENT_MODULE};
use thiserror::Error;

use crate::env;

/// Interpreter used when detection finds nothing.
const FALLBACK_INTERPRETER: &str = "python3";

/// Agent directory shipped next to a packaged executable.
const PACKAGED_AGENT_DIR: &str = "resources/agent";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk `config.toml` shape. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub agent: AgentSection,
    pub supervisor: SupervisorSection,
    pub daemon: DaemonSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSection {
    pub interpreter: Option<String>,
    pub module: Option<String>,
    pub dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorSection {
    pub stop_timeout_ms: Option<u64>,
    pub log_capacity: Option<usize>,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSection {
    pub exit_guard: Option<bool>,
}

impl FileConfig {
    /// Read `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` means probe at startup
    pub interpreter: Option<String>,
    pub module: String,
    pub agent_dir: PathBuf,
    pub agent_env: Vec<(String, String)>,
    pub stop_timeout: Duration,
    pub log_capacity: usize,
    pub command_timeout: Duration,
    pub exit_guard: bool,
}

impl Settings {
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let file = FileConfig::load(config_path)?;
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Ok(Self::resolve(file, exe_dir.as_deref(), &cwd))
    }

    /// Layer environment overrides over `file`, then defaults.
    pub fn resolve(file: FileConfig, exe_dir: Option<&Path>, cwd: &Path) -> Self {
        let FileConfig {
            agent,
            supervisor,
            daemon,
        } = file;

        let agent_dir = env::agent_dir()
            .or(agent.dir)
            .unwrap_or_else(|| default_agent_dir(exe_dir, cwd));

        Self {
            interpreter: env::interpreter().or(agent.interpreter),
            module: env::agent_module()
                .or(agent.module)
                .unwrap_or_else(|| DEFAULT_AGENT_MODULE.to_string()),
            agent_dir,
            agent_env: agent.env.into_iter().collect(),
            stop_timeout: env::stop_timeout()
                .or(supervisor.stop_timeout_ms.map(Duration::from_millis))
                .unwrap_or(tether_engine::config::DEFAULT_STOP_TIMEOUT),
            log_capacity: env::log_capacity()
                .or(supervisor.log_capacity)
                .unwrap_or(DEFAULT_LOG_CAPACITY),
            command_timeout: env::command_timeout()
                .or(supervisor.command_timeout_ms.map(Duration::from_millis))
                .unwrap_or(tether_engine::config::DEFAULT_COMMAND_TIMEOUT),
            exit_guard: env::exit_guard().or(daemon.exit_guard).unwrap_or(true),
        }
    }

    /// Build the supervisor config, probing for an interpreter if none is set.
    pub async fn supervisor_config(&self) -> SupervisorConfig {
        let interpreter = match &self.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => match detect_interpreter(INTERPRETER_CANDIDATES).await {
                Some(found) => {
                    tracing::info!(program = %found.program, version = %found.version, "using detected interpreter");
                    found.program
                }
                None => {
                    tracing::warn!(fallback = FALLBACK_INTERPRETER, "no interpreter found");
                    FALLBACK_INTERPRETER.to_string()
                }
            },
        };

        let mut launch = LaunchSpec::python_module(interpreter, &self.module, &self.agent_dir);
        for (key, value) in &self.agent_env {
            launch = launch.env(key, value);
        }
        SupervisorConfig::new(launch)
            .stop_timeout(self.stop_timeout)
            .log_capacity(self.log_capacity)
            .command_timeout(self.command_timeout)
    }
}

/// Packaged layout when present, otherwise the working directory.
fn default_agent_dir(exe_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    exe_dir
        .map(|dir| dir.join(PACKAGED_AGENT_DIR))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| cwd.to_path_buf())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
