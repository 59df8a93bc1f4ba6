/*!
 * Process Invocation Boundary
 * One bounded bluetoothctl call per invocation
 */

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::error::{FacadeError, Result};

pub const DEFAULT_PROGRAM: &str = "bluetoothctl";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs the real tool as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::debug!("Running {} {}", self.program.display(), invocation.args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // own group, so a timeout also reaches anything the tool forks
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|source| FacadeError::ToolUnavailable {
                program: self.program.clone(),
                source,
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                read_pipe(stdout_pipe.as_mut(), &mut stdout),
                read_pipe(stderr_pipe.as_mut(), &mut stderr),
            )?;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };

        let outcome = tokio::time::timeout(invocation.timeout, collect).await;
        match outcome {
            Ok(collected) => {
                let (status, stdout, stderr) = collected?;
                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    status: status.code(),
                })
            }
            Err(_) => {
                tracing::error!(
                    "{} {} exceeded {:?}, killing",
                    self.program.display(),
                    invocation.args.join(" "),
                    invocation.timeout
                );
                terminate(&mut child).await;
                Err(FacadeError::Timeout {
                    args: invocation.args.clone(),
                    timeout: invocation.timeout,
                })
            }
        }
    }
}

/// Kills the child's process group, then the child itself, and reaps it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                tracing::warn!("Failed to kill process group {}: {}", pid, e);
            }
        }
    }
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill timed out child: {}", e);
    }
}

async fn read_pipe<R>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(pipe) => pipe.read_to_end(buf).await,
        None => Ok(0),
    }
}
