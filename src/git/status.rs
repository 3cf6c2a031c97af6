//! Porcelain status parsing and git-style status rendering.

use std::fmt;

/// How a path changed in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed { from: String },
    Copied { from: String },
    TypeChanged,
}

impl ChangeKind {
    /// Map a porcelain / name-status code to a change kind.
    ///
    /// `from` is the original path for renames and copies.
    pub fn from_code(code: char, from: Option<&str>) -> Option<Self> {
        let from = from.unwrap_or_default().to_string();
        match code {
            'A' => Some(ChangeKind::Added),
            'M' => Some(ChangeKind::Modified),
            'D' => Some(ChangeKind::Deleted),
            'R' => Some(ChangeKind::Renamed { from }),
            'C' => Some(ChangeKind::Copied { from }),
            'T' => Some(ChangeKind::TypeChanged),
            _ => None,
        }
    }

    /// Label used by git's long status format.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Added => "new file",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed { .. } => "renamed",
            ChangeKind::Copied { .. } => "copied",
            ChangeKind::TypeChanged => "typechange",
        }
    }

    pub fn original_path(&self) -> Option<&str> {
        match self {
            ChangeKind::Renamed { from } | ChangeKind::Copied { from } => Some(from),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Format one entry the way `git status` and the commit template list it:
/// `modified:   path`, `renamed:    old -> new`.
pub fn long_status_line(kind: &ChangeKind, path: &str) -> String {
    let label = format!("{}:", kind.label());
    match kind.original_path() {
        Some(from) => format!("{label:<12}{from} -> {path}"),
        None => format!("{label:<12}{path}"),
    }
}

/// Current position of HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Branch(String),
    Detached(String),
}

impl BranchState {
    pub fn name(&self) -> &str {
        match self {
            BranchState::Branch(name) | BranchState::Detached(name) => name,
        }
    }

    /// `On branch main` / `HEAD detached at 1a2b3c4`.
    pub fn describe(&self) -> String {
        match self {
            BranchState::Branch(name) => format!("On branch {name}"),
            BranchState::Detached(sha) => format!("HEAD detached at {sha}"),
        }
    }
}

/// One record of `git status --porcelain -z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index (staged) column.
    pub index: char,
    /// Working tree column.
    pub worktree: char,
    pub path: String,
    /// Source path for renames and copies.
    pub orig_path: Option<String>,
}

impl StatusEntry {
    pub fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }

    pub fn is_unmerged(&self) -> bool {
        self.index == 'U'
            || self.worktree == 'U'
            || (self.index == 'A' && self.worktree == 'A')
            || (self.index == 'D' && self.worktree == 'D')
    }

    /// The staged change this entry represents, if any.
    pub fn staged_kind(&self) -> Option<ChangeKind> {
        if self.is_untracked() || self.is_unmerged() {
            return None;
        }
        ChangeKind::from_code(self.index, self.orig_path.as_deref())
    }

    /// The unstaged working-tree change this entry represents, if any.
    pub fn unstaged_kind(&self) -> Option<ChangeKind> {
        if self.is_untracked() || self.is_unmerged() {
            return None;
        }
        match self.worktree {
            'M' | 'D' | 'T' => ChangeKind::from_code(self.worktree, None),
            _ => None,
        }
    }

    /// Short porcelain form, e.g. `M  src/lib.rs` or `R  old -> new`.
    pub fn porcelain_line(&self) -> String {
        match &self.orig_path {
            Some(orig) => format!("{}{} {} -> {}", self.index, self.worktree, orig, self.path),
            None => format!("{}{} {}", self.index, self.worktree, self.path),
        }
    }
}

/// Parse `git status --porcelain -z` output.
///
/// Records are NUL-terminated `XY path`; renames and copies are followed by
/// an extra NUL-terminated record holding the original path.
pub fn parse_porcelain_z(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut records = output.split('\0').filter(|r| !r.is_empty());

    while let Some(record) = records.next() {
        let mut chars = record.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        let Some(path) = record.get(3..).filter(|p| !p.is_empty()) else {
            continue;
        };

        let orig_path = if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
            records.next().map(str::to_string)
        } else {
            None
        };

        entries.push(StatusEntry {
            index,
            worktree,
            path: path.to_string(),
            orig_path,
        });
    }

    entries
}

/// Render what `git commit` prints when there is nothing staged.
pub fn nothing_to_commit_report(
    branch: &BranchState,
    initial_commit: bool,
    entries: &[StatusEntry],
) -> String {
    let mut lines = vec![branch.describe()];
    if initial_commit {
        lines.push(String::new());
        lines.push("No commits yet".to_string());
    }

    let mut unstaged: Vec<String> = entries
        .iter()
        .filter_map(|e| e.unstaged_kind().map(|k| long_status_line(&k, &e.path)))
        .collect();
    unstaged.sort();

    let mut untracked: Vec<&str> = entries
        .iter()
        .filter(|e| e.is_untracked())
        .map(|e| e.path.as_str())
        .collect();
    untracked.sort_unstable();

    if !unstaged.is_empty() {
        lines.push(String::new());
        lines.push("Changes not staged for commit:".to_string());
        lines.push("  (use \"git add <file>...\" to update what will be committed)".to_string());
        lines.push(
            "  (use \"git restore <file>...\" to discard changes in working directory)".to_string(),
        );
        lines.extend(unstaged.iter().map(|l| format!("\t{l}")));
    }

    if !untracked.is_empty() {
        lines.push(String::new());
        lines.push("Untracked files:".to_string());
        lines.push("  (use \"git add <file>...\" to include in what will be committed)".to_string());
        lines.extend(untracked.iter().map(|p| format!("\t{p}")));
    }

    lines.push(String::new());
    let closing = if !unstaged.is_empty() {
        "no changes added to commit (use \"git add\" and/or \"git commit -a\")"
    } else if !untracked.is_empty() {
        "nothing added to commit but untracked files present (use \"git add\" to track)"
    } else if initial_commit {
        "nothing to commit (create/copy files and use \"git add\" to track)"
    } else {
        "nothing to commit, working tree clean"
    };
    lines.push(closing.to_string());

    lines.join("\n")
}
