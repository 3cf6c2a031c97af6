//! Editor buffer rendering and git-style cleanup.
//!
//! The buffer mirrors what `git commit` puts in `COMMIT_EDITMSG`: the
//! message, a `#` comment block describing the commit, and for `-v` a
//! scissors line followed by the diff. Reading it back applies git's
//! `strip` cleanup.

use crate::commit::applier::CommitFlags;
use crate::commit::prompt::WARNING_PREFIX;
use crate::git::collector::RepoSnapshot;
use crate::git::status::{ChangeKind, long_status_line};

/// git's scissors line. Everything from it onwards is ignored.
pub const SCISSORS_LINE: &str = "# ------------------------ >8 ------------------------";

const WARNING_CONTINUATIONS: [&str; 2] = ["# Found in:", "# Details:"];

/// Split a model draft into the message and trailing warning comments.
///
/// Warning blocks start with the warning prefix; `#` lines directly after
/// one belong to it.
pub fn split_warnings(draft: &str) -> (String, Vec<String>) {
    let mut message = Vec::new();
    let mut warnings = Vec::new();
    let mut in_warning = false;

    for line in draft.lines() {
        let starts_block = line.starts_with(WARNING_PREFIX)
            || WARNING_CONTINUATIONS.iter().any(|p| line.starts_with(p));
        if starts_block || (in_warning && line.starts_with('#')) {
            warnings.push(line.to_string());
            in_warning = true;
        } else if line.trim().is_empty() && in_warning {
            warnings.push(String::new());
        } else {
            in_warning = false;
            message.push(line);
        }
    }

    while warnings.last().is_some_and(|w| w.is_empty()) {
        warnings.pop();
    }

    (message.join("\n").trim_end().to_string(), warnings)
}

/// Render the full editor buffer.
pub fn render_buffer(
    message: &str,
    warnings: &[String],
    snapshot: &RepoSnapshot,
    flags: &CommitFlags,
) -> String {
    let mut out = String::new();
    out.push_str(message.trim_end());
    out.push_str("\n\n");

    if !warnings.is_empty() {
        for line in warnings {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("#\n");
    }

    let mut block = CommentBlock(&mut out);
    block.line("Please enter the commit message for your changes. Lines starting");
    block.line("with '#' will be ignored, and an empty message aborts the commit.");
    block.line("");

    let mut notes = Vec::new();
    if flags.amend {
        notes.push("You are amending the previous commit.".to_string());
    }
    if snapshot.auto_staged {
        notes.push("Tracked files were staged automatically (-a).".to_string());
    }
    if flags.no_verify {
        notes.push("Git hooks will be skipped (--no-verify).".to_string());
    }
    if flags.allow_empty {
        notes.push("This may be an empty commit (--allow-empty).".to_string());
    }
    if let Some(author) = &flags.author {
        notes.push(format!("Author: {author}"));
    }
    if let Some(date) = &flags.date {
        notes.push(format!("Date:   {date}"));
    }
    for note in &notes {
        block.line(note);
    }
    if !notes.is_empty() {
        block.line("");
    }

    block.line(&snapshot.branch.describe());
    if snapshot.initial_commit {
        block.line("");
        block.line("Initial commit");
    }
    block.line("");

    let committed = committed_paths(snapshot);
    if committed.is_empty() {
        block.line("No changes to be committed (empty commit)");
    } else {
        block.line("Changes to be committed:");
        for (kind, path) in &committed {
            block.entry(&long_status_line(kind, path));
        }
    }
    block.line("");

    let unstaged: Vec<String> = snapshot
        .status
        .iter()
        .filter_map(|e| e.unstaged_kind().map(|k| long_status_line(&k, &e.path)))
        .collect();
    if !unstaged.is_empty() {
        block.line("Changes not staged for commit:");
        for line in &unstaged {
            block.entry(line);
        }
        block.line("");
    }

    let untracked: Vec<&str> = snapshot
        .status
        .iter()
        .filter(|e| e.is_untracked())
        .map(|e| e.path.as_str())
        .collect();
    if !untracked.is_empty() {
        block.line("Untracked files:");
        for path in &untracked {
            block.entry(path);
        }
        block.line("");
    }

    if let Some(diff) = &snapshot.verbose_diff {
        out.push_str(SCISSORS_LINE);
        out.push('\n');
        out.push_str("# Do not modify or remove the line above.\n");
        out.push_str("# Everything below it will be ignored.\n");
        out.push_str(diff);
        if !diff.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

struct CommentBlock<'a>(&'a mut String);

impl CommentBlock<'_> {
    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.0.push_str("#\n");
        } else {
            self.0.push_str("# ");
            self.0.push_str(text);
            self.0.push('\n');
        }
    }

    // Status entries are written as `#\t<entry>`, like git.
    fn entry(&mut self, text: &str) {
        self.0.push_str("#\t");
        self.0.push_str(text);
        self.0.push('\n');
    }
}

/// Paths the commit will contain. For amend, the amended commit's files
/// come first and newly staged changes replace them by path.
fn committed_paths(snapshot: &RepoSnapshot) -> Vec<(ChangeKind, String)> {
    let mut paths: Vec<(ChangeKind, String)> = snapshot
        .amend
        .iter()
        .flat_map(|a| a.files.iter().map(|f| (f.kind.clone(), f.path.clone())))
        .collect();

    for change in &snapshot.changes {
        match paths.iter_mut().find(|(_, path)| *path == change.path) {
            Some(existing) => existing.0 = change.kind.clone(),
            None => paths.push((change.kind.clone(), change.path.clone())),
        }
    }
    paths
}

/// Apply git's `strip` cleanup to an edited buffer.
///
/// Cuts at the scissors line, drops `#` lines, strips trailing whitespace,
/// collapses runs of blank lines and trims blank lines at both ends.
pub fn parse_buffer(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim_end() == SCISSORS_LINE {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        let line = line.trim_end();
        if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
