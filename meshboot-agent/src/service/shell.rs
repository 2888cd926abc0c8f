//! Shell service
//!
//! Runs command strings through a shell, the way hooks and task commands are
//! written by users: `<shell> -c "<command>"`, optionally inside a working
//! directory and optionally with stdout redirected to a socket.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Descriptor that becomes a command's stdout instead of the inherited one
pub type OutputSink = OwnedFd;

/// Exit status of a shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code; `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    #[cfg(test)]
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    #[cfg(test)]
    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Service trait for running shell commands
#[async_trait]
pub trait Shell: Send + Sync {
    /// Runs a command to completion
    ///
    /// # Arguments
    /// * `command` - Command line, interpreted by the shell
    /// * `cwd` - Working directory; `None` keeps the agent's own
    /// * `sink` - Descriptor for stdout; `None` inherits the agent's stdout
    ///
    /// # Returns
    /// The command's exit status once the shell itself has exited.
    /// Background processes it started are not waited for. `Err` means the
    /// command could not be started.
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        sink: Option<OutputSink>,
    ) -> io::Result<CommandStatus>;
}

/// Shell implementation backed by a real shell binary
pub struct SystemShell {
    program: String,
}

impl SystemShell {
    /// Creates a new system shell
    ///
    /// # Arguments
    /// * `program` - Shell binary, e.g. `/bin/sh`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Builds the `<shell> -c <command>` invocation
    pub(crate) fn command(&self, command: &str, cwd: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

#[async_trait]
impl Shell for SystemShell {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        sink: Option<OutputSink>,
    ) -> io::Result<CommandStatus> {
        debug!(shell = %self.program, cwd = ?cwd, "Running: {}", command);

        let mut cmd = self.command(command, cwd);
        if let Some(fd) = sink {
            cmd.stdout(Stdio::from(fd));
        }

        let mut child = cmd.spawn()?;
        // Our copy of the sink must not outlive the spawn
        drop(cmd);

        Ok(child.wait().await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read};
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let shell = SystemShell::default();
        assert!(shell.run("true", None, None).await.unwrap().success());

        let status = shell.run("exit 3", None, None).await.unwrap();
        assert_eq!(status, CommandStatus::from_code(3));
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_run_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let shell = SystemShell::default();

        let status = shell
            .run("pwd > where.txt", Some(dir.path()), None)
            .await
            .unwrap();
        assert!(status.success());

        let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            Path::new(recorded.trim()).canonicalize().unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_run_writes_stdout_to_sink() {
        let (mut ours, theirs) = UnixStream::pair().unwrap();
        let shell = SystemShell::default();

        let status = shell
            .run("echo one; echo two; exit 4", None, Some(theirs.into()))
            .await
            .unwrap();
        assert_eq!(status.code, Some(4));

        // Every writer is gone once the shell exited
        let mut received = String::new();
        ours.read_to_string(&mut received).unwrap();
        assert_eq!(received, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_background_process_does_not_hold_up_run() {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let shell = SystemShell::default();

        let started = Instant::now();
        let status = shell
            .run("sleep 5 & echo started", None, Some(theirs.into()))
            .await
            .unwrap();
        assert!(status.success());
        assert!(started.elapsed() < Duration::from_secs(3));

        let mut line = String::new();
        BufReader::new(ours).read_line(&mut line).unwrap();
        assert_eq!(line, "started\n");
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let shell = SystemShell::new("/nonexistent/shell");
        assert!(shell.run("true", None, None).await.is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CommandStatus::from_code(2).to_string(), "exit code 2");
        assert_eq!(CommandStatus::signaled().to_string(), "terminated by signal");
    }
}
