use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::time::Duration;

use bluedeck_facade::{DeviceFacade, ProcessRunner, DEFAULT_PROGRAM};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub socket_path: String,
    pub tool: ToolConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub program: String,
    pub timeout_secs: u64,
    pub strict_exit_status: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: "/run/bluedeck/bluedeck.sock".to_string(),
            tool: ToolConfig::default(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            timeout_secs: 10,
            strict_exit_status: false,
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &str) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).with_context(|| format!("invalid config {}", path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("cannot read config {}", path)),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(mut self, program: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(program) = program {
            self.tool.program = program;
        }
        if let Some(timeout_secs) = timeout_secs {
            self.tool.timeout_secs = timeout_secs;
        }
        self
    }

    pub fn facade(&self) -> DeviceFacade {
        DeviceFacade::new(ProcessRunner::new(&self.tool.program))
            .with_timeout(Duration::from_secs(self.tool.timeout_secs))
            .with_strict_exit_status(self.tool.strict_exit_status)
    }
}
