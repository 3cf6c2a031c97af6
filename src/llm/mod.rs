//! Commit message generation through an OpenAI-compatible provider.

pub mod client;
pub mod redact;
pub mod retry;

pub use client::{ChatMessage, ChatRequest, CompletionClient, OpenAiClient};
pub use redact::redact_secrets;
pub use retry::retry_transient;

use tracing::debug;

use crate::commit::context::CommitContext;
use crate::commit::prompt::system_instruction;
use crate::config::RepoConfig;
use crate::error::ProviderError;

/// Build the chat request for `context`.
pub fn build_request(context: &CommitContext, repo: &RepoConfig, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system_instruction(repo, context)),
            ChatMessage::user(context.prompt()),
        ],
    }
}

/// Ask the provider for a draft message, retrying once on transient failure.
pub async fn generate(
    client: &dyn CompletionClient,
    context: &CommitContext,
    repo: &RepoConfig,
    model: &str,
) -> Result<String, ProviderError> {
    let request = build_request(context, repo, model);
    if context.reductions().any() {
        debug!("Context reduced to fit the limit: {:?}", context.reductions());
    }

    let draft = retry_transient(|| client.complete(&request)).await?;
    debug!("Received draft of {} chars", draft.chars().count());
    Ok(draft)
}
