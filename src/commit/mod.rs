//! Commit message context, instructions and application.

pub mod applier;
pub mod context;
pub mod prompt;
pub mod template;

pub use applier::{CommitFlags, CommitResult, apply, dry_run};
pub use context::{CommitContext, ContextBuilder, ContextReductions, MAX_PROMPT_CHARS};
pub use prompt::{WARNING_PREFIX, system_instruction};
pub use template::{ResolvedTemplate, TemplateResolver, TemplateSource};
