/*!
 * Facade Error Types
 */

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FacadeError>;

#[derive(Debug, Error)]
pub enum FacadeError {
    /// The tool did not exit within the bound; the child has been killed.
    #[error("bluetoothctl {} timed out after {timeout:?}", args.join(" "))]
    Timeout { args: Vec<String>, timeout: Duration },

    #[error("cannot start {}: {source}", program.display())]
    ToolUnavailable {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Only raised when strict exit checking is enabled.
    #[error("tool exited with status {}: {stderr}", status.map_or_else(|| "signal".to_string(), |s| s.to_string()))]
    ExternalTool { status: Option<i32>, stderr: String },

    #[error("I/O error while reading tool output: {0}")]
    Io(#[from] io::Error),
}

impl FacadeError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FacadeError::Timeout { .. } => "timeout",
            FacadeError::ToolUnavailable { .. } => "tool_unavailable",
            FacadeError::ExternalTool { .. } => "external_tool",
            FacadeError::Io(_) => "io",
        }
    }
}

/// Failure to decompose a version string into `(major, minor)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("expected 2 numeric components, found {0}")]
    UnexpectedComponents(usize),

    #[error("numeric component {0:?} out of range")]
    Overflow(String),
}
