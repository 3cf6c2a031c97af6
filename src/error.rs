//! Error types for git-commitai modules using thiserror.

use thiserror::Error;

/// Exit code git uses for fatal errors (`fatal: ...`).
pub const EXIT_GIT_FATAL: i32 = 128;

/// Exit code git commit uses for "nothing to commit" and aborted messages.
pub const EXIT_GIT_ABORT: i32 = 1;

/// Exit code for provider and provider-configuration failures.
///
/// git commit itself only exits with 0, 1, 128 or 129, so 3 never collides
/// with a forwarded git failure.
pub const EXIT_PROVIDER_FAILURE: i32 = 3;

/// Exit code after SIGINT, matching shells' 128 + signal number.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors from git subprocesses and repository state.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git executable not found in PATH")]
    NotInstalled,

    #[error("Failed to spawn git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("fatal: not a git repository (or any of the parent directories): .git")]
    NotAGitRepository,

    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{report}")]
    NoStagedChanges { report: String },

    #[error("fatal: You have nothing to amend.")]
    NothingToAmend,

    #[error("Failed to prepare temporary index: {0}")]
    TempIndex(#[source] std::io::Error),
}

/// Errors from resolving provider configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "GIT_COMMIT_AI_KEY is not set.\n\n\
         Set up your API credentials:\n  \
         export GIT_COMMIT_AI_KEY='your-api-key'\n  \
         export GIT_COMMIT_AI_URL='https://openrouter.ai/api/v1/chat/completions'  # or your provider's URL\n  \
         export GIT_COMMIT_AI_MODEL='qwen/qwen3-coder'  # or your preferred model\n\n\
         Key-less local backends accept any placeholder value, or pass --api-key."
    )]
    MissingApiKey,

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Errors from the AI provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("AI provider unreachable: {0}")]
    Unreachable(String),

    #[error("AI provider rejected the API key (HTTP {status}). Check GIT_COMMIT_AI_KEY or --api-key.")]
    Auth { status: u16 },

    #[error("AI provider rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("AI provider returned a server error (HTTP {status})")]
    Server { status: u16 },

    #[error("AI provider returned an empty commit message")]
    EmptyResponse,

    #[error("AI provider returned an unparseable response: {0}")]
    BadResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ProviderError {
    /// Whether a single retry is allowed for this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Unreachable(_) | ProviderError::Server { .. })
    }
}

/// Errors from preparing or reading the editor buffer.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Failed to create commit message buffer: {0}")]
    BufferCreate(#[source] std::io::Error),

    #[error("Failed to write commit message buffer: {0}")]
    BufferWrite(#[source] std::io::Error),

    #[error("Failed to launch editor '{editor}': {source}")]
    LaunchFailed {
        editor: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from applying the commit.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(
        "fatal: -a/--all cannot be used with --amend\n\
         The --amend flag rewrites the previous commit and does not auto-stage new changes."
    )]
    IncompatibleFlags,

    #[error("Failed to write final commit message: {0}")]
    MessageFile(#[source] std::io::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Umbrella error for one invocation.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl Error {
    /// Process exit code for this error, mirroring git where git has one.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Git(e) | Error::Commit(CommitError::Git(e)) => git_exit_code(e),
            Error::Config(_) | Error::Provider(_) => EXIT_PROVIDER_FAILURE,
            Error::Editor(_) => EXIT_GIT_ABORT,
            Error::Commit(CommitError::IncompatibleFlags) => EXIT_GIT_FATAL,
            Error::Commit(CommitError::MessageFile(_)) => EXIT_GIT_ABORT,
        }
    }
}

fn git_exit_code(err: &GitError) -> i32 {
    match err {
        GitError::NoStagedChanges { .. } => EXIT_GIT_ABORT,
        GitError::CommandFailed { code, .. } if *code > 0 => *code,
        _ => EXIT_GIT_FATAL,
    }
}
