//! git-commitai - CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use git_commitai::error::{EXIT_GIT_FATAL, EXIT_INTERRUPTED};
use git_commitai::{
    CommitFlags, CommitOptions, CommitResult, Error, GitError, ProviderOverrides, SystemGit,
    Workflow,
};

const AFTER_HELP: &str = "\
Commit message templates are looked up in this order:
  1. .gitmessage at the repository root
  2. the file named by `git config commit.template`
  3. ~/.gitmessage

Environment:
  GIT_COMMIT_AI_KEY      API key for the provider
  GIT_COMMIT_AI_URL      chat completions endpoint
  GIT_COMMIT_AI_MODEL    model name
  GIT_COMMIT_AI_TIMEOUT  request timeout in seconds";

/// Generate a commit message with AI, then commit exactly as git would.
#[derive(Parser, Debug)]
#[command(name = "git-commitai")]
#[command(about = "Generate a commit message with AI, then commit exactly as git would")]
#[command(version, after_help = AFTER_HELP)]
struct Cli {
    /// Extra context for the generated message (not used verbatim)
    #[arg(short = 'm', long = "message", value_name = "CONTEXT")]
    message: Option<String>,

    /// Stage modified and deleted tracked files before committing
    #[arg(short = 'a', long)]
    all: bool,

    /// Bypass the pre-commit and commit-msg hooks
    #[arg(short = 'n', long)]
    no_verify: bool,

    /// Show the staged diff below the scissors line in the editor
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Replace the tip of the current branch with a new commit
    #[arg(long)]
    amend: bool,

    /// Allow a commit that records no changes
    #[arg(long)]
    allow_empty: bool,

    /// Override the commit author
    #[arg(long, value_name = "AUTHOR")]
    author: Option<String>,

    /// Override the author date
    #[arg(long, value_name = "DATE")]
    date: Option<String>,

    /// Show what would be committed without generating a message
    #[arg(long)]
    dry_run: bool,

    /// Print debug logs to stderr
    #[arg(long)]
    debug: bool,

    /// API key (overrides GIT_COMMIT_AI_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Chat completions endpoint (overrides GIT_COMMIT_AI_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Model name (overrides GIT_COMMIT_AI_MODEL)
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,
}

impl Cli {
    fn options(self) -> CommitOptions {
        CommitOptions {
            flags: CommitFlags {
                all: self.all,
                no_verify: self.no_verify,
                amend: self.amend,
                allow_empty: self.allow_empty,
                author: self.author,
                date: self.date,
            },
            extra_context: self.message,
            verbose: self.verbose,
            dry_run: self.dry_run,
            provider: ProviderOverrides {
                api_key: self.api_key,
                api_url: self.api_url,
                model: self.model,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = tokio::select! {
        code = run(cli) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}

/// Log to stderr; `RUST_LOG` wins over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "git_commitai=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> i32 {
    match execute(cli).await {
        Ok(result) => {
            if let Some(reason) = &result.abort_reason {
                eprintln!("{reason}");
            }
            result.exit_code
        }
        Err(err) => report(&err),
    }
}

async fn execute(cli: Cli) -> Result<CommitResult> {
    SystemGit::check_installed().map_err(Error::from)?;

    let workdir = std::env::current_dir().context("Failed to read the current directory")?;
    let git = SystemGit::new(workdir);

    let result = Workflow::new(&git).run(&cli.options()).await?;
    Ok(result)
}

/// Print `err` the way git would and pick the exit code.
fn report(err: &anyhow::Error) -> i32 {
    let Some(error) = err.downcast_ref::<Error>() else {
        eprintln!("fatal: {err:#}");
        return EXIT_GIT_FATAL;
    };

    match error {
        // git prints its status report on stdout.
        Error::Git(GitError::NoStagedChanges { report }) => println!("{report}"),
        _ => eprintln!("{error}"),
    }
    error.exit_code()
}
