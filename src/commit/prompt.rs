//! System instruction sent ahead of the assembled context.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::commit::context::CommitContext;
use crate::config::RepoConfig;

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex"));

/// Prefix of the warning comments the model may append after the message.
pub const WARNING_PREFIX: &str = "# ⚠️  WARNING:";

const AMEND_NOTE: &str = "Note: You are amending the previous commit.";

const DEFAULT_INSTRUCTION: &str = r#"You write git commit messages that follow git conventions strictly.

## Structure
- A simple, self-explanatory change gets a subject line only.
- A change that needs explanation gets a subject line, one blank line, then a body.
- Only add a body when it says something the diff cannot: the motivation or context.

## Subject line
- At most 50 characters, shorter when possible.
- Capitalized, imperative mood ("Add", "Fix", "Remove"), no trailing period.
- It should complete the sentence "If applied, this commit will ...".

## Body
- Wrap lines at 72 characters.
- Explain what changed and why, not how.
- Use "-" bullets for several distinct points.

## Follow the project
If a project commit template is provided, follow its format and conventions
while keeping the rules above.

## Code issue warnings
After the message you may flag severe problems visible in the changes, such
as hardcoded secrets, syntax errors, misspelled identifiers, null references
or missing imports. Write each warning as git comment lines:
# ⚠️  WARNING: <brief description>
# Found in: <file>
# Details: <specific concern>
Never warn about the commit message itself.

## Output
Output the commit message, then any warning comments, and nothing else:
no explanations, no markdown, no code fences."#;

/// Build the system instruction for this invocation.
///
/// A `.gitcommitai` prompt replaces the default instruction. Its
/// `{CONTEXT}`, `{GITMESSAGE}` and `{AMEND_NOTE}` placeholders are filled in;
/// `{DIFF}` and `{FILES}` are dropped because the changes always travel in
/// the user message.
pub fn system_instruction(repo: &RepoConfig, context: &CommitContext) -> String {
    match &repo.prompt {
        Some(custom) => render_custom(custom, context),
        None if context.is_amend() => format!("{DEFAULT_INSTRUCTION}\n\n{AMEND_NOTE}"),
        None => DEFAULT_INSTRUCTION.to_string(),
    }
}

fn render_custom(custom: &str, context: &CommitContext) -> String {
    let user_context = context
        .extra_context()
        .map(|c| format!("Additional context from user: {c}"))
        .unwrap_or_default();
    let template = context.template().map(|t| t.content.as_str()).unwrap_or_default();
    let amend_note = if context.is_amend() { AMEND_NOTE } else { "" };

    let rendered = custom
        .replace("{CONTEXT}", &user_context)
        .replace("{GITMESSAGE}", template)
        .replace("{AMEND_NOTE}", amend_note)
        .replace("{DIFF}", "")
        .replace("{FILES}", "");

    EXCESS_BLANK_LINES
        .replace_all(&rendered, "\n\n")
        .trim_matches('\n')
        .to_string()
}
