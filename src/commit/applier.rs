//! Hands the final message to `git commit`.

use std::io::Write;

use tracing::debug;

use crate::editor::session::AbortReason;
use crate::error::{CommitError, EXIT_GIT_ABORT, GitError};
use crate::git::runner::{GitCommand, GitRunner};

/// `git commit` flags that pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitFlags {
    pub all: bool,
    pub no_verify: bool,
    pub amend: bool,
    pub allow_empty: bool,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl CommitFlags {
    /// Reject flag combinations git-commitai does not support.
    ///
    /// Runs before any subprocess is started.
    pub fn validate(&self) -> Result<(), CommitError> {
        if self.all && self.amend {
            return Err(CommitError::IncompatibleFlags);
        }
        Ok(())
    }

    /// Flags in `git commit` argument form.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.all {
            args.push("--all".to_string());
        }
        if self.amend {
            args.push("--amend".to_string());
        }
        if self.no_verify {
            args.push("--no-verify".to_string());
        }
        if self.allow_empty {
            args.push("--allow-empty".to_string());
        }
        if let Some(author) = &self.author {
            args.push(format!("--author={author}"));
        }
        if let Some(date) = &self.date {
            args.push(format!("--date={date}"));
        }
        args
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    pub exit_code: i32,
    /// Message handed to git; `None` when the user aborted.
    pub message: Option<String>,
    pub amended: bool,
    pub abort_reason: Option<AbortReason>,
}

impl CommitResult {
    pub fn aborted(reason: AbortReason, amended: bool) -> Self {
        Self {
            exit_code: EXIT_GIT_ABORT,
            message: None,
            amended,
            abort_reason: Some(reason),
        }
    }
}

/// Commit `message` with `flags` and forward git's exit code.
///
/// git's own output reaches the terminal unchanged. The message file lives
/// in the git directory and is removed when this returns.
pub fn apply(
    runner: &dyn GitRunner,
    git_dir: &std::path::Path,
    message: &str,
    flags: &CommitFlags,
) -> Result<CommitResult, CommitError> {
    let mut file = tempfile::Builder::new()
        .prefix("COMMITAI_MSG.")
        .tempfile_in(git_dir)
        .map_err(CommitError::MessageFile)?;
    file.write_all(message.as_bytes())
        .and_then(|()| file.write_all(b"\n"))
        .and_then(|()| file.flush())
        .map_err(CommitError::MessageFile)?;

    let mut args = vec!["commit".to_string()];
    args.extend(flags.to_args());
    args.push("--cleanup=verbatim".to_string());
    args.push("-F".to_string());
    args.push(file.path().to_string_lossy().into_owned());

    let command = GitCommand::new(args);
    let exit_code = runner.run_inherited(&command).map_err(CommitError::Git)?;
    debug!("git commit exited with {exit_code}");

    Ok(CommitResult {
        exit_code,
        message: Some(message.to_string()),
        amended: flags.amend,
        abort_reason: None,
    })
}

/// Run `git commit --dry-run` with the same flags and forward its exit code.
pub fn dry_run(runner: &dyn GitRunner, flags: &CommitFlags) -> Result<i32, GitError> {
    let mut args = vec!["commit".to_string(), "--dry-run".to_string()];
    args.extend(flags.to_args());
    runner.run_inherited(&GitCommand::new(args))
}
