//! Edit/confirm workflow.
//!
//! `DraftedMessage -> PresentedBuffer -> EditorOutcome`. Each step consumes
//! the previous state, so a buffer cannot be edited twice and an outcome
//! cannot exist without an editor run.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::commit::applier::CommitFlags;
use crate::editor::buffer::{parse_buffer, render_buffer, split_warnings};
use crate::editor::launcher::EditorLauncher;
use crate::error::EditorError;
use crate::git::collector::RepoSnapshot;

/// Why the commit was not made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    EmptyMessage,
    EditorFailed { status: i32 },
    BufferUnreadable,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::EmptyMessage => write!(f, "Aborting commit due to empty commit message."),
            AbortReason::EditorFailed { status } => write!(
                f,
                "There was a problem with the editor (exit status {status}). Aborting commit."
            ),
            AbortReason::BufferUnreadable => {
                write!(f, "Could not read the commit message buffer. Aborting commit.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    Accepted(String),
    Aborted(AbortReason),
}

/// A model draft, split into message and warning comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedMessage {
    message: String,
    warnings: Vec<String>,
}

impl DraftedMessage {
    pub fn new(draft: &str) -> Self {
        let (message, warnings) = split_warnings(draft);
        Self { message, warnings }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Write the buffer to a temporary file in `git_dir`.
    pub fn present(
        self,
        snapshot: &RepoSnapshot,
        flags: &CommitFlags,
        git_dir: &Path,
    ) -> Result<PresentedBuffer, EditorError> {
        let text = render_buffer(&self.message, &self.warnings, snapshot, flags);

        let mut file = tempfile::Builder::new()
            .prefix("COMMITAI_EDITMSG.")
            .tempfile_in(git_dir)
            .map_err(EditorError::BufferCreate)?;
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(EditorError::BufferWrite)?;

        debug!("Commit buffer written to {}", file.path().display());
        Ok(PresentedBuffer { file })
    }
}

/// A buffer on disk, waiting for the user.
///
/// The file is removed when this value (or the future owning it) is dropped.
#[derive(Debug)]
pub struct PresentedBuffer {
    file: NamedTempFile,
}

impl PresentedBuffer {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Run the editor and read back the cleaned-up message.
    pub async fn edit(self, launcher: &dyn EditorLauncher) -> Result<EditorOutcome, EditorError> {
        let status = launcher.edit(self.path()).await?;
        if status != 0 {
            debug!("Editor {} exited with {status}", launcher.name());
            return Ok(EditorOutcome::Aborted(AbortReason::EditorFailed { status }));
        }

        let text = match std::fs::read_to_string(self.path()) {
            Ok(text) => text,
            Err(e) => {
                debug!("Failed to read buffer back: {e}");
                return Ok(EditorOutcome::Aborted(AbortReason::BufferUnreadable));
            }
        };

        let message = parse_buffer(&text);
        if message.is_empty() {
            Ok(EditorOutcome::Aborted(AbortReason::EmptyMessage))
        } else {
            Ok(EditorOutcome::Accepted(message))
        }
    }
}
