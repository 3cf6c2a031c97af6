//! Per-repository `.gitcommitai` file.
//!
//! Two formats are accepted: a JSON object with optional `model` and
//! `prompt` keys, or plain text where `model: <name>` / `model=<name>` lines
//! pick the model and everything else is a custom system instruction.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

/// File name looked up at the repository root.
pub const REPO_CONFIG_FILE: &str = ".gitcommitai";

/// Settings read from `.gitcommitai`. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    pub model: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Deserialize)]
struct JsonRepoConfig {
    model: Option<String>,
    prompt: Option<String>,
}

impl RepoConfig {
    /// Load `.gitcommitai` from the repository root.
    ///
    /// A missing or unreadable file yields the empty config.
    pub fn load(toplevel: &Path) -> Self {
        let path = toplevel.join(REPO_CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Found {} at {}", REPO_CONFIG_FILE, path.display());
                Self::parse(&content)
            }
            Err(e) => {
                debug!("No usable {}: {}", REPO_CONFIG_FILE, e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();
        if trimmed.starts_with('{') {
            match serde_json::from_str::<JsonRepoConfig>(trimmed) {
                Ok(json) => {
                    debug!("Loaded {} as JSON", REPO_CONFIG_FILE);
                    return Self {
                        model: json.model.filter(|m| !m.trim().is_empty()),
                        prompt: json.prompt.filter(|p| !p.trim().is_empty()),
                    };
                }
                Err(e) => debug!("{} is not valid JSON ({e}), reading as text", REPO_CONFIG_FILE),
            }
        }

        let mut model = None;
        let mut prompt_lines = Vec::new();
        for line in content.lines() {
            let stripped = line.trim();
            let value = stripped
                .strip_prefix("model:")
                .or_else(|| stripped.strip_prefix("model="));
            match value {
                Some(value) => model = Some(value.trim().to_string()),
                None => prompt_lines.push(line),
            }
        }

        let prompt = prompt_lines.join("\n").trim().to_string();
        Self {
            model: model.filter(|m| !m.is_empty()),
            prompt: (!prompt.is_empty()).then_some(prompt),
        }
    }
}
