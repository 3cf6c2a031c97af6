//! git-commitai - `git commit` with an AI-drafted message.
//!
//! # Overview
//!
//! git-commitai collects the staged changes the way git sees them, asks an
//! OpenAI-compatible provider for a draft, opens the draft in the editor git
//! would use and hands the confirmed message to `git commit`. Flags, hooks,
//! exit codes and abort behaviour follow git.

pub mod commit;
pub mod config;
pub mod editor;
pub mod error;
pub mod git;
pub mod llm;
pub mod workflow;

// Re-export commonly used types
pub use commit::{CommitFlags, CommitResult};
pub use config::{ProviderConfig, ProviderOverrides, RepoConfig};
pub use editor::{AbortReason, EditorLauncher, EditorOutcome, GitEditor};
pub use error::{CommitError, ConfigError, EditorError, Error, GitError, ProviderError};
pub use git::{GitRunner, SystemGit};
pub use llm::{CompletionClient, OpenAiClient};
pub use workflow::{CommitOptions, Workflow};
