//! Commit message template lookup.
//!
//! Precedence is fixed: the repository's own `.gitmessage`, then the file
//! named by `commit.template`, then `~/.gitmessage`. The first file that
//! exists and is not blank wins; templates are never merged.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GitError;
use crate::git::runner::{GitCommand, GitRunner};

pub const TEMPLATE_FILE: &str = ".gitmessage";

/// Which lookup produced the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    Repository,
    GitConfig,
    Home,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Repository => write!(f, "repository .gitmessage"),
            TemplateSource::GitConfig => write!(f, "commit.template"),
            TemplateSource::Home => write!(f, "~/.gitmessage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub source: TemplateSource,
    pub path: PathBuf,
    pub content: String,
}

/// Resolves the commit template for one repository.
pub struct TemplateResolver<'a> {
    runner: &'a dyn GitRunner,
    toplevel: PathBuf,
    home: Option<PathBuf>,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(runner: &'a dyn GitRunner, toplevel: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            toplevel: toplevel.into(),
            home: dirs::home_dir(),
        }
    }

    /// Use a different home directory for `~` lookups.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn resolve(&self) -> Result<Option<ResolvedTemplate>, GitError> {
        let repo_template = self.toplevel.join(TEMPLATE_FILE);
        if let Some(found) = read_template(TemplateSource::Repository, &repo_template) {
            return Ok(Some(found));
        }

        if let Some(configured) = self.configured_template()?
            && let Some(found) = read_template(TemplateSource::GitConfig, &configured)
        {
            return Ok(Some(found));
        }

        if let Some(home) = &self.home
            && let Some(found) = read_template(TemplateSource::Home, &home.join(TEMPLATE_FILE))
        {
            return Ok(Some(found));
        }

        debug!("No commit template found");
        Ok(None)
    }

    /// Path named by `commit.template`, with `~` expanded and relative
    /// paths taken from the repository root.
    fn configured_template(&self) -> Result<Option<PathBuf>, GitError> {
        let output = self
            .runner
            .run(&GitCommand::new(["config", "--get", "commit.template"]))?;
        let value = output.stdout.trim();
        if !output.success() || value.is_empty() {
            return Ok(None);
        }
        Ok(Some(expand_path(value, self.home.as_deref(), &self.toplevel)))
    }
}

fn expand_path(value: &str, home: Option<&Path>, toplevel: &Path) -> PathBuf {
    if let Some(home) = home {
        if value == "~" {
            return home.to_path_buf();
        }
        if let Some(rest) = value.strip_prefix("~/") {
            return home.join(rest);
        }
    }

    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        toplevel.join(path)
    }
}

fn read_template(source: TemplateSource, path: &Path) -> Option<ResolvedTemplate> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            debug!(
                "Using commit template from {} ({}, {} chars)",
                source,
                path.display(),
                content.len()
            );
            Some(ResolvedTemplate {
                source,
                path: path.to_path_buf(),
                content,
            })
        }
        Ok(_) => {
            debug!("Skipping blank template {}", path.display());
            None
        }
        Err(e) => {
            debug!("Failed to read template {}: {}", path.display(), e);
            None
        }
    }
}
