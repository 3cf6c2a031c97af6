//! Editor resolution and launch, the way git does it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::EditorError;
use crate::git::runner::{GitCommand, GitRunner, exit_code};

/// Editor used when git cannot name one.
pub const FALLBACK_EDITOR: &str = "vi";

/// Trait for opening the buffer in an editor.
///
/// This abstraction allows replacing the interactive editor in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EditorLauncher: Send + Sync {
    /// Open `path` and wait for the editor to exit; returns its exit code.
    async fn edit(&self, path: &Path) -> Result<i32, EditorError>;

    /// Editor name for messages.
    fn name(&self) -> String;
}

/// Launches the editor configured for git.
#[derive(Debug, Clone)]
pub struct GitEditor {
    editor: String,
    workdir: PathBuf,
}

impl GitEditor {
    pub fn new(editor: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            editor: editor.into(),
            workdir: workdir.into(),
        }
    }

    /// Ask git for the editor (`git var GIT_EDITOR`).
    ///
    /// git already applies `GIT_EDITOR`, `core.editor`, `VISUAL` and
    /// `EDITOR` in that order.
    pub fn resolve(runner: &dyn GitRunner, workdir: impl Into<PathBuf>) -> Self {
        let editor = match runner.run(&GitCommand::new(["var", "GIT_EDITOR"])) {
            Ok(output) if output.success() && !output.stdout.trim().is_empty() => {
                output.stdout.trim().to_string()
            }
            Ok(output) => {
                debug!("git var GIT_EDITOR gave nothing ({}), using {FALLBACK_EDITOR}", output.stderr.trim());
                FALLBACK_EDITOR.to_string()
            }
            Err(e) => {
                debug!("git var GIT_EDITOR failed ({e}), using {FALLBACK_EDITOR}");
                FALLBACK_EDITOR.to_string()
            }
        };
        debug!("Using editor: {editor}");
        Self::new(editor, workdir)
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }
}

#[async_trait]
impl EditorLauncher for GitEditor {
    async fn edit(&self, path: &Path) -> Result<i32, EditorError> {
        // `:` is git's no-op editor.
        if self.editor == ":" {
            return Ok(0);
        }

        debug!("Launching {} {}", self.editor, path.display());
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!("{} \"$@\"", self.editor))
            .arg(&self.editor)
            .arg(path)
            .current_dir(&self.workdir)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| EditorError::LaunchFailed {
                editor: self.editor.clone(),
                source,
            })?;

        Ok(exit_code(status))
    }

    fn name(&self) -> String {
        self.editor.clone()
    }
}
