//! Git state collection: staged changes, file contents, status and amend context.
//!
//! Everything is gathered through a [`GitRunner`], so the collector never
//! touches the object database directly and git stays the authority on what
//! a commit will contain.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::commit::context::MAX_PROMPT_CHARS;
use crate::error::GitError;
use crate::git::runner::{GitCommand, GitRunner};
use crate::git::status::{BranchState, ChangeKind, StatusEntry, nothing_to_commit_report, parse_porcelain_z};

/// Largest index blob whose full text is offered to the model.
///
/// Bigger files are summarized by their diff only.
pub const MAX_FILE_CONTENT_BYTES: u64 = 64 * 1024;

/// Size and type of a binary file. Bytes are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInfo {
    pub size: Option<u64>,
    pub description: String,
}

impl BinaryInfo {
    /// Marker line shown in place of a diff.
    pub fn marker(&self) -> String {
        match self.size {
            Some(size) => format!("binary file changed ({}, {})", self.description, format_size(size)),
            None => format!("binary file changed ({})", self.description),
        }
    }
}

/// One staged path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub path: String,
    pub kind: ChangeKind,
    pub binary: bool,
    /// Unified diff against HEAD. `None` for binary files.
    pub diff: Option<String>,
    /// Full staged text. `None` for binary, deleted or oversized files.
    pub content: Option<String>,
    /// Set when the content ceiling was hit.
    pub content_omitted: bool,
    pub binary_info: Option<BinaryInfo>,
}

impl StagedChange {
    pub fn diff_len(&self) -> usize {
        self.diff.as_deref().map_or(0, str::len)
    }
}

/// A path touched by the commit being amended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendFile {
    pub path: String,
    pub kind: ChangeKind,
}

/// The commit `--amend` will replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendContext {
    pub message: String,
    pub diff: String,
    pub files: Vec<AmendFile>,
}

/// What the collector was asked to gather.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectOptions {
    pub all: bool,
    pub amend: bool,
    pub allow_empty: bool,
    pub verbose: bool,
}

/// Everything known about the repository for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub changes: Vec<StagedChange>,
    pub branch: BranchState,
    pub status: Vec<StatusEntry>,
    pub initial_commit: bool,
    pub amend: Option<AmendContext>,
    pub auto_staged: bool,
    /// Raw diff for the verbose scissors section.
    pub verbose_diff: Option<String>,
}

impl RepoSnapshot {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Collects repository facts for the current invocation.
pub struct GitStateCollector<'a> {
    runner: &'a dyn GitRunner,
    toplevel: PathBuf,
    git_dir: PathBuf,
    temp_index: Option<TempDir>,
}

impl<'a> GitStateCollector<'a> {
    /// Locate the repository the runner operates in.
    ///
    /// Returns `NotAGitRepository` when git cannot find one.
    pub fn open(runner: &'a dyn GitRunner) -> Result<Self, GitError> {
        let command = GitCommand::new(["rev-parse", "--show-toplevel", "--absolute-git-dir"]);
        let output = runner.run(&command)?;
        if !output.success() {
            debug!("rev-parse failed: {}", output.stderr.trim());
            return Err(GitError::NotAGitRepository);
        }

        let mut lines = output.stdout.lines().map(str::trim).filter(|l| !l.is_empty());
        let (Some(toplevel), Some(git_dir)) = (lines.next(), lines.next()) else {
            return Err(GitError::NotAGitRepository);
        };

        debug!("Repository root: {toplevel}, git dir: {git_dir}");
        Ok(Self {
            runner,
            toplevel: PathBuf::from(toplevel),
            git_dir: PathBuf::from(git_dir),
            temp_index: None,
        })
    }

    pub fn toplevel(&self) -> &Path {
        &self.toplevel
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn runner(&self) -> &'a dyn GitRunner {
        self.runner
    }

    /// Build a command that sees the temporary index when one is active.
    fn git<I, S>(&self, args: I) -> GitCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = GitCommand::new(args);
        match &self.temp_index {
            Some(dir) => command.env("GIT_INDEX_FILE", OsString::from(dir.path().join("index"))),
            None => command,
        }
    }

    fn stdout<I, S>(&self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = self.git(args);
        self.runner.run(&command)?.into_stdout(&command)
    }

    fn succeeds<I, S>(&self, args: I) -> Result<bool, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.runner.run(&self.git(args))?.success())
    }

    pub fn has_head(&self) -> Result<bool, GitError> {
        self.succeeds(["rev-parse", "--verify", "--quiet", "HEAD"])
    }

    pub fn branch(&self) -> Result<BranchState, GitError> {
        let name = self.stdout(["branch", "--show-current"])?;
        let name = name.trim();
        if !name.is_empty() {
            return Ok(BranchState::Branch(name.to_string()));
        }

        let output = self.runner.run(&self.git(["rev-parse", "--short", "HEAD"]))?;
        let sha = output.stdout.trim();
        Ok(BranchState::Detached(if output.success() && !sha.is_empty() {
            sha.to_string()
        } else {
            "HEAD".to_string()
        }))
    }

    pub fn status_entries(&self) -> Result<Vec<StatusEntry>, GitError> {
        let output = self.stdout(["status", "--porcelain", "-z"])?;
        Ok(parse_porcelain_z(&output))
    }

    /// Stage tracked modifications into a scoped copy of the index.
    ///
    /// Later commands see what `git commit -a` will commit; the real index
    /// is left alone and the copy is removed when the collector is dropped.
    pub fn stage_tracked(&mut self) -> Result<(), GitError> {
        let dir = tempfile::Builder::new()
            .prefix("commitai-index.")
            .tempdir_in(&self.git_dir)
            .map_err(GitError::TempIndex)?;

        let real_index = self.git_dir.join("index");
        if real_index.exists() {
            std::fs::copy(&real_index, dir.path().join("index")).map_err(GitError::TempIndex)?;
        }

        debug!("Auto-staging tracked files into {}", dir.path().display());
        self.temp_index = Some(dir);
        self.stdout(["add", "-u"])?;
        Ok(())
    }

    /// Staged changes derived from `status` plus numstat and per-file diffs.
    pub fn collect_staged(&self, status: &[StatusEntry]) -> Result<Vec<StagedChange>, GitError> {
        let numstat = self.stdout([
            "diff",
            "--cached",
            "--no-ext-diff",
            "--no-color",
            "--numstat",
            "-z",
            "-M",
        ])?;
        let binaries = parse_numstat_z(&numstat);

        let mut changes = Vec::new();
        let mut diff_len = 0;
        for entry in status {
            let Some(kind) = entry.staged_kind() else {
                continue;
            };
            // Past the prompt ceiling the context builder drops contents anyway.
            let read_contents = diff_len <= MAX_PROMPT_CHARS;
            let change = self.staged_change(&entry.path, kind, &binaries, read_contents)?;
            diff_len += change.diff_len();
            changes.push(change);
        }
        if diff_len > MAX_PROMPT_CHARS {
            debug!("Staged diffs total {diff_len} bytes, skipped remaining file contents");
        }

        debug!("Collected {} staged changes", changes.len());
        Ok(changes)
    }

    fn staged_change(
        &self,
        path: &str,
        kind: ChangeKind,
        binaries: &HashMap<String, bool>,
        read_contents: bool,
    ) -> Result<StagedChange, GitError> {
        // Porcelain paths are relative to the top level, pathspecs to the cwd.
        // Literal magic keeps `[`, `*` and `?` in names from matching other paths.
        let mut args: Vec<String> = ["diff", "--cached", "--no-ext-diff", "--no-color", "-M", "--"]
            .into_iter()
            .map(String::from)
            .collect();
        if let Some(from) = kind.original_path() {
            args.push(format!(":(top,literal){from}"));
        }
        args.push(format!(":(top,literal){path}"));
        let diff = self.stdout(args)?;

        let binary = binaries.get(path).copied().unwrap_or(false) || has_binary_marker(&diff);
        if binary {
            let info = self.binary_info(path, &kind)?;
            debug!("{path} is binary: {}", info.marker());
            return Ok(StagedChange {
                path: path.to_string(),
                kind,
                binary: true,
                diff: None,
                content: None,
                content_omitted: false,
                binary_info: Some(info),
            });
        }

        let (content, content_omitted) = if kind == ChangeKind::Deleted || !read_contents {
            (None, false)
        } else {
            self.read_file_contents(path)?
        };

        Ok(StagedChange {
            path: path.to_string(),
            kind,
            binary: false,
            diff: Some(diff),
            content,
            content_omitted,
            binary_info: None,
        })
    }

    /// Staged text of `path`, or `(None, true)` when it exceeds
    /// [`MAX_FILE_CONTENT_BYTES`].
    pub fn read_file_contents(&self, path: &str) -> Result<(Option<String>, bool), GitError> {
        let spec = format!(":{path}");
        let Some(size) = self.blob_size(&spec)? else {
            return Ok((None, false));
        };
        if size > MAX_FILE_CONTENT_BYTES {
            debug!("{path} is {size} bytes, omitting full content");
            return Ok((None, true));
        }

        let content = self.stdout(["show".to_string(), spec])?;
        Ok((Some(content), false))
    }

    fn blob_size(&self, spec: &str) -> Result<Option<u64>, GitError> {
        let output = self.runner.run(&self.git(["cat-file", "-s", spec]))?;
        if !output.success() {
            return Ok(None);
        }
        Ok(output.stdout.trim().parse().ok())
    }

    /// Size and description for a binary path.
    ///
    /// Deleted files are measured in HEAD, everything else in the index.
    pub fn binary_info(&self, path: &str, kind: &ChangeKind) -> Result<BinaryInfo, GitError> {
        let spec = if *kind == ChangeKind::Deleted {
            format!("HEAD:{path}")
        } else {
            format!(":{path}")
        };
        Ok(BinaryInfo {
            size: self.blob_size(&spec)?,
            description: describe_binary(path).to_string(),
        })
    }

    /// Message, patch and touched paths of HEAD.
    pub fn collect_amend_context(&self) -> Result<AmendContext, GitError> {
        if !self.has_head()? {
            return Err(GitError::NothingToAmend);
        }

        let message = self.stdout(["log", "-1", "--format=%B", "HEAD"])?;
        let has_parent = self.succeeds(["rev-parse", "--verify", "--quiet", "HEAD^"])?;
        let diff = if has_parent {
            self.stdout(["diff", "--no-ext-diff", "--no-color", "-M", "HEAD^", "HEAD"])?
        } else {
            self.stdout([
                "diff-tree",
                "-p",
                "--root",
                "--no-commit-id",
                "--no-ext-diff",
                "--no-color",
                "-M",
                "HEAD",
            ])?
        };
        let name_status = self.stdout([
            "diff-tree",
            "--no-commit-id",
            "--name-status",
            "-r",
            "--root",
            "-M",
            "-z",
            "HEAD",
        ])?;

        Ok(AmendContext {
            message: message.trim_end().to_string(),
            diff,
            files: parse_name_status_z(&name_status),
        })
    }

    /// Gather everything one invocation needs.
    pub fn snapshot(&mut self, options: CollectOptions) -> Result<RepoSnapshot, GitError> {
        let amend = if options.amend {
            Some(self.collect_amend_context()?)
        } else {
            None
        };

        if options.all {
            self.stage_tracked()?;
        }

        let initial_commit = !self.has_head()?;
        let branch = self.branch()?;
        let status = self.status_entries()?;
        let changes = self.collect_staged(&status)?;

        if changes.is_empty() && amend.is_none() && !options.allow_empty {
            return Err(GitError::NoStagedChanges {
                report: nothing_to_commit_report(&branch, initial_commit, &status),
            });
        }

        let verbose_diff = if options.verbose {
            let staged = self.stdout(["diff", "--cached", "--no-ext-diff", "--no-color", "-M"])?;
            Some(match &amend {
                Some(ctx) => format!("{}{}", ctx.diff, staged),
                None => staged,
            })
        } else {
            None
        };

        Ok(RepoSnapshot {
            changes,
            branch,
            status,
            initial_commit,
            amend,
            auto_staged: options.all,
            verbose_diff,
        })
    }
}

fn has_binary_marker(diff: &str) -> bool {
    diff.lines()
        .any(|line| line.starts_with("Binary files ") && line.ends_with(" differ"))
}

/// Map each path in `git diff --numstat -z` output to whether it is binary.
///
/// Renames appear as `added\tdeleted\t\0old\0new\0`.
pub fn parse_numstat_z(output: &str) -> HashMap<String, bool> {
    let mut result = HashMap::new();
    let mut records = output.split('\0');

    while let Some(record) = records.next() {
        let mut fields = record.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let binary = added == "-" && deleted == "-";

        if path.is_empty() {
            let _old = records.next();
            if let Some(new) = records.next() {
                result.insert(new.to_string(), binary);
            }
        } else {
            result.insert(path.to_string(), binary);
        }
    }

    result
}

/// Parse `git diff-tree --name-status -z` output.
pub fn parse_name_status_z(output: &str) -> Vec<AmendFile> {
    let mut files = Vec::new();
    let mut records = output.split('\0').filter(|r| !r.is_empty());

    while let Some(status) = records.next() {
        let Some(code) = status.chars().next() else {
            continue;
        };
        let kind = if matches!(code, 'R' | 'C') {
            let (Some(from), Some(to)) = (records.next(), records.next()) else {
                break;
            };
            ChangeKind::from_code(code, Some(from)).map(|kind| (kind, to))
        } else {
            records
                .next()
                .and_then(|path| ChangeKind::from_code(code, None).map(|kind| (kind, path)))
        };

        if let Some((kind, path)) = kind {
            files.push(AmendFile {
                path: path.to_string(),
                kind,
            });
        }
    }

    files
}

/// Human description of a binary file from its extension.
pub fn describe_binary(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "JPEG image",
        Some("png") => "PNG image",
        Some("gif") => "GIF image",
        Some("webp") => "WebP image",
        Some("svg") => "SVG image",
        Some("ico") => "Icon file",
        Some("pdf") => "PDF document",
        Some("zip") => "ZIP archive",
        Some("tar") => "TAR archive",
        Some("gz") => "GZIP archive",
        Some("exe") => "Windows executable",
        Some("dll") => "Windows library",
        Some("so") => "Shared library",
        Some("dylib") => "macOS dynamic library",
        Some("mp3") => "MP3 audio",
        Some("mp4") => "MP4 video",
        Some("avi") => "AVI video",
        Some("mov") => "QuickTime video",
        Some("ttf") => "TrueType font",
        Some("woff" | "woff2") => "Web font",
        Some("db" | "sqlite") => "Database file",
        _ => "binary data",
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} bytes")
    } else if b < KIB * KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{:.1} MB", b / (KIB * KIB))
    }
}
