//! End-to-end orchestration of one invocation.
//!
//! Flags are checked first, then the repository is inspected, the context
//! built, a draft requested, the editor run and finally `git commit` invoked.
//! Nothing is committed before the editor returns an accepted message.

use std::path::PathBuf;

use tracing::debug;

use crate::commit::applier::{self, CommitFlags, CommitResult};
use crate::commit::context::ContextBuilder;
use crate::commit::template::TemplateResolver;
use crate::config::{ProviderConfig, ProviderOverrides, RepoConfig};
use crate::editor::launcher::{EditorLauncher, GitEditor};
use crate::editor::session::{DraftedMessage, EditorOutcome};
use crate::error::Error;
use crate::git::collector::{CollectOptions, GitStateCollector};
use crate::git::runner::GitRunner;
use crate::llm::{self, CompletionClient, OpenAiClient};

/// Everything the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub flags: CommitFlags,
    /// `-m` text, used only as extra context for generation.
    pub extra_context: Option<String>,
    pub verbose: bool,
    pub dry_run: bool,
    pub provider: ProviderOverrides,
}

/// One invocation against a repository.
///
/// The provider client and editor default to `OpenAiClient` and the editor
/// git would use; both can be replaced.
pub struct Workflow<'a> {
    git: &'a dyn GitRunner,
    client: Option<&'a dyn CompletionClient>,
    editor: Option<&'a dyn EditorLauncher>,
    template_home: Option<PathBuf>,
}

impl<'a> Workflow<'a> {
    pub fn new(git: &'a dyn GitRunner) -> Self {
        Self {
            git,
            client: None,
            editor: None,
            template_home: dirs::home_dir(),
        }
    }

    pub fn with_client(mut self, client: &'a dyn CompletionClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_editor(mut self, editor: &'a dyn EditorLauncher) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Home directory searched for `~/.gitmessage`; `None` disables it.
    pub fn with_template_home(mut self, home: Option<PathBuf>) -> Self {
        self.template_home = home;
        self
    }

    pub async fn run(&self, options: &CommitOptions) -> Result<CommitResult, Error> {
        let flags = &options.flags;
        flags.validate()?;

        let mut collector = GitStateCollector::open(self.git)?;
        let toplevel = collector.toplevel().to_path_buf();
        let git_dir = collector.git_dir().to_path_buf();

        if options.dry_run {
            if flags.amend {
                collector.collect_amend_context()?;
            }
            let exit_code = applier::dry_run(self.git, flags)?;
            return Ok(CommitResult {
                exit_code,
                message: None,
                amended: flags.amend,
                abort_reason: None,
            });
        }

        let snapshot = collector.snapshot(CollectOptions {
            all: flags.all,
            amend: flags.amend,
            allow_empty: flags.allow_empty,
            verbose: options.verbose,
        })?;
        // Drops the temporary index used for `-a`.
        drop(collector);
        debug!(
            "Collected {} staged change(s); {}",
            snapshot.changes.len(),
            snapshot.branch.describe()
        );

        let repo_config = RepoConfig::load(&toplevel);
        let provider = ProviderConfig::resolve(&options.provider, &repo_config)?;
        debug!("Provider configuration: {provider:?}");

        let template = TemplateResolver::new(self.git, &toplevel)
            .with_home(self.template_home.clone())
            .resolve()?;

        let context = ContextBuilder::new().build(
            snapshot,
            template,
            options.extra_context.clone(),
            options.verbose,
        );

        let draft = match self.client {
            Some(client) => llm::generate(client, &context, &repo_config, &provider.model).await?,
            None => {
                let client = OpenAiClient::new(&provider)?;
                llm::generate(&client, &context, &repo_config, &provider.model).await?
            }
        };

        let buffer = DraftedMessage::new(&draft).present(context.snapshot(), flags, &git_dir)?;
        let outcome = match self.editor {
            Some(editor) => buffer.edit(editor).await?,
            None => buffer.edit(&GitEditor::resolve(self.git, &toplevel)).await?,
        };

        match outcome {
            EditorOutcome::Accepted(message) => {
                Ok(applier::apply(self.git, &git_dir, &message, flags)?)
            }
            EditorOutcome::Aborted(reason) => {
                debug!("Commit aborted: {reason:?}");
                Ok(CommitResult::aborted(reason, flags.amend))
            }
        }
    }
}
