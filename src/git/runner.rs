//! Process-execution seam for git.
//!
//! Every git interaction goes through [`GitRunner`] so the orchestration
//! core can be exercised against a mock instead of a real `git` binary.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{EXIT_INTERRUPTED, GitError};

/// A git invocation: arguments plus extra environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
    envs: Vec<(String, OsString)>,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
        }
    }

    /// Add an environment variable for this invocation only.
    pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.envs.push((key.to_string(), value.into()));
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, OsString)] {
        &self.envs
    }

    /// Whether the arguments start with the given subcommand tokens.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }

    /// Human-readable form used in logs and error messages.
    pub fn display(&self) -> String {
        format!("git {}", self.args.join(" "))
    }
}

/// Captured result of a git invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into [`GitError::CommandFailed`].
    pub fn into_stdout(self, command: &GitCommand) -> Result<String, GitError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(GitError::CommandFailed {
                command: command.display(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Trait for executing git commands.
///
/// This abstraction allows mocking the git subprocess in tests.
#[cfg_attr(test, mockall::automock)]
pub trait GitRunner: Send + Sync {
    /// Run git with captured stdout/stderr.
    fn run(&self, command: &GitCommand) -> Result<GitOutput, GitError>;

    /// Run git with the terminal's stdio and return its exit code.
    fn run_inherited(&self, command: &GitCommand) -> Result<i32, GitError>;
}

/// Runner that shells out to the system `git` binary.
pub struct SystemGit {
    workdir: PathBuf,
}

impl SystemGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Check that git is installed and accessible.
    ///
    /// Uses the `which` crate for cross-platform executable detection.
    pub fn check_installed() -> Result<(), GitError> {
        which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
    }

    fn command(&self, command: &GitCommand) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(command.args()).current_dir(&self.workdir);
        for (key, value) in command.envs() {
            cmd.env(key, value);
        }
        cmd
    }
}

fn spawn_error(err: std::io::Error) -> GitError {
    if err.kind() == ErrorKind::NotFound {
        GitError::NotInstalled
    } else {
        GitError::SpawnFailed(err)
    }
}

/// Exit code of a finished child.
///
/// A child killed by a signal reports `128 + signal` like a shell does, so a
/// Ctrl-C delivered to git or the editor surfaces as [`EXIT_INTERRUPTED`].
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    EXIT_INTERRUPTED
}

impl GitRunner for SystemGit {
    fn run(&self, command: &GitCommand) -> Result<GitOutput, GitError> {
        debug!("Running {}", command.display());

        let output = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(spawn_error)?;

        let result = GitOutput {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.success() {
            debug!("{} succeeded, {} bytes of output", command.display(), result.stdout.len());
        } else {
            debug!("{} exited with {}: {}", command.display(), result.code, result.stderr.trim());
        }

        Ok(result)
    }

    fn run_inherited(&self, command: &GitCommand) -> Result<i32, GitError> {
        debug!("Running {} (interactive)", command.display());

        let status = self.command(command).status().map_err(spawn_error)?;
        let code = exit_code(status);
        debug!("{} exited with {}", command.display(), code);
        Ok(code)
    }
}
