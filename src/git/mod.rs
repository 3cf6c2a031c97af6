//! Git operations through the `git` executable.

pub mod collector;
pub mod runner;
pub mod status;

pub use collector::{
    AmendContext, AmendFile, BinaryInfo, CollectOptions, GitStateCollector, MAX_FILE_CONTENT_BYTES,
    RepoSnapshot, StagedChange,
};
pub use runner::{GitCommand, GitOutput, GitRunner, SystemGit, exit_code};
pub use status::{BranchState, ChangeKind, StatusEntry};
