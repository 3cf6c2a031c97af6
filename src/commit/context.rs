//! Bounded prompt assembly.
//!
//! [`ContextBuilder::build`] performs no I/O: equal inputs always produce
//! byte-identical prompt text. When the rendered text exceeds the limit,
//! detail is shed in a fixed order:
//!
//! 1. full file contents
//! 2. the previous commit's diff (its message stays)
//! 3. non-primary file sections, from the end of the list
//! 4. the tail of the primary diff
//!
//! The primary change is the file with the largest diff and is never
//! dropped. When an amend stages nothing new, the previous commit's diff is
//! what gets committed, so it becomes the primary change and is truncated
//! rather than dropped. Omitted paths are listed by name.
//!
//! Each section is rendered once and its length kept in a running tally, so
//! reductions never re-render the whole prompt.

use std::collections::VecDeque;

use crate::commit::template::ResolvedTemplate;
use crate::git::collector::{AmendContext, MAX_FILE_CONTENT_BYTES, RepoSnapshot, StagedChange};
use crate::git::status::long_status_line;

/// Upper bound on the assembled prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 120_000;

/// Cap on the template text carried into the prompt.
pub const MAX_TEMPLATE_CHARS: usize = 8_000;

/// Cap on `-m` context carried into the prompt.
pub const MAX_EXTRA_CONTEXT_CHARS: usize = 8_000;

/// Cap on the amended commit's message carried into the prompt.
pub const MAX_PREVIOUS_MESSAGE_CHARS: usize = 8_000;

const MAX_STATUS_LINES: usize = 50;
const MAX_OMITTED_LISTED: usize = 200;

const SECTION_SEPARATOR: &str = "\n\n";
const OMITTED_HEADER: &str = "## Other staged files (details omitted to fit the context limit)";
const TRUNCATION_MARKER: &str = "\n[... diff truncated to fit the context limit ...]";

/// What the size bound removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextReductions {
    pub contents_dropped: bool,
    pub previous_diff_dropped: bool,
    pub omitted_paths: Vec<String>,
    pub primary_truncated: bool,
}

impl ContextReductions {
    pub fn any(&self) -> bool {
        self.contents_dropped
            || self.previous_diff_dropped
            || !self.omitted_paths.is_empty()
            || self.primary_truncated
    }
}

/// Everything the provider and the editor need for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitContext {
    snapshot: RepoSnapshot,
    template: Option<ResolvedTemplate>,
    extra_context: Option<String>,
    verbose: bool,
    prompt: String,
    reductions: ContextReductions,
}

impl CommitContext {
    pub fn snapshot(&self) -> &RepoSnapshot {
        &self.snapshot
    }

    pub fn template(&self) -> Option<&ResolvedTemplate> {
        self.template.as_ref()
    }

    pub fn extra_context(&self) -> Option<&str> {
        self.extra_context.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_amend(&self) -> bool {
        self.snapshot.amend.is_some()
    }

    /// The assembled user message.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn reductions(&self) -> &ContextReductions {
        &self.reductions
    }
}

/// How much of a diff a section shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffShown {
    Full,
    Truncated(usize),
    Hidden,
}

/// A rendered section and its length in chars.
struct Section {
    text: String,
    chars: usize,
}

impl Section {
    fn new(text: String) -> Self {
        let chars = char_len(&text);
        Self { text, chars }
    }
}

/// Running length of the joined prompt.
#[derive(Debug, Default)]
struct Tally {
    chars: usize,
    sections: usize,
}

impl Tally {
    fn add(&mut self, chars: usize) {
        self.chars += chars;
        self.sections += 1;
    }

    fn remove(&mut self, chars: usize) {
        self.chars -= chars;
        self.sections -= 1;
    }

    fn replace(&mut self, section: &mut Section, text: String) {
        let next = Section::new(text);
        self.chars = self.chars - section.chars + next.chars;
        *section = next;
    }

    fn total(&self) -> usize {
        self.chars + SECTION_SEPARATOR.len() * self.sections.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    limit: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            limit: MAX_PROMPT_CHARS,
        }
    }

    /// Builder with a custom character limit.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }

    pub fn build(
        &self,
        snapshot: RepoSnapshot,
        template: Option<ResolvedTemplate>,
        extra_context: Option<String>,
        verbose: bool,
    ) -> CommitContext {
        let extra_context = extra_context.filter(|c| !c.trim().is_empty());
        let (prompt, reductions) =
            self.assemble(&snapshot, template.as_ref(), extra_context.as_deref());

        CommitContext {
            snapshot,
            template,
            extra_context,
            verbose,
            prompt,
            reductions,
        }
    }

    fn assemble(
        &self,
        snapshot: &RepoSnapshot,
        template: Option<&ResolvedTemplate>,
        extra_context: Option<&str>,
    ) -> (String, ContextReductions) {
        let changes = &snapshot.changes;
        let primary = primary_index(changes);
        let mut reductions = ContextReductions::default();
        let mut tally = Tally::default();

        let mut head = Vec::new();
        if let Some(template) = template {
            head.push(render_template(template));
        }
        if let Some(extra) = extra_context {
            head.push(render_extra(extra));
        }
        head.push(render_state(snapshot));
        for section in &head {
            tally.add(char_len(section));
        }

        let mut files: Vec<Section> = changes
            .iter()
            .map(|c| Section::new(render_change(c, true, DiffShown::Full)))
            .collect();
        for file in &files {
            tally.add(file.chars);
        }

        let amend = snapshot.amend.as_ref();
        let amend_is_primary = changes.is_empty() && amend.is_some_and(|a| !a.diff.is_empty());
        let mut previous = amend.map(|a| Section::new(render_amend(a, DiffShown::Full)));
        if let Some(section) = &previous {
            tally.add(section.chars);
        }

        if tally.total() > self.limit && has_contents(snapshot) {
            for (file, change) in files.iter_mut().zip(changes) {
                if change.content.is_some() {
                    tally.replace(file, render_change(change, false, DiffShown::Full));
                }
            }
            reductions.contents_dropped = true;
        }

        if tally.total() > self.limit
            && !amend_is_primary
            && let Some(amend) = amend.filter(|a| !a.diff.is_empty())
            && let Some(section) = previous.as_mut()
        {
            tally.replace(section, render_amend(amend, DiffShown::Hidden));
            reductions.previous_diff_dropped = true;
        }

        let line_chars: Vec<usize> = changes.iter().map(|c| char_len(&omitted_line(c))).collect();
        let mut kept = vec![true; changes.len()];
        let mut omitted: VecDeque<usize> = VecDeque::new();
        let mut omitted_chars = 0;
        let mut index = changes.len();
        while tally.total() > self.limit && index > 0 {
            index -= 1;
            if Some(index) == primary {
                continue;
            }
            kept[index] = false;
            tally.remove(files[index].chars);
            omitted.push_front(index);

            let chars = omitted_section_chars(&omitted, &line_chars);
            if omitted.len() == 1 {
                tally.add(chars);
            } else {
                tally.chars = tally.chars - omitted_chars + chars;
            }
            omitted_chars = chars;
        }

        if tally.total() > self.limit {
            let include_contents = !reductions.contents_dropped;
            if amend_is_primary
                && let Some(amend) = amend
                && let Some(section) = previous.as_mut()
            {
                fit_diff(&mut tally, section, &amend.diff, self.limit, |shown| {
                    render_amend(amend, shown)
                });
                reductions.primary_truncated = true;
            } else if let Some(p) = primary
                && let Some(diff) = changes[p].diff.as_deref()
            {
                let change = &changes[p];
                fit_diff(&mut tally, &mut files[p], diff, self.limit, |shown| {
                    render_change(change, include_contents, shown)
                });
                reductions.primary_truncated = true;
            }
        }

        let mut sections = head;
        sections.extend(
            files
                .into_iter()
                .zip(&kept)
                .filter(|(_, kept)| **kept)
                .map(|(file, _)| file.text),
        );
        if !omitted.is_empty() {
            let omitted: Vec<&StagedChange> = omitted.iter().map(|&i| &changes[i]).collect();
            sections.push(render_omitted(&omitted));
        }
        if let Some(section) = previous {
            sections.push(section.text);
        }

        let mut prompt = sections.join(SECTION_SEPARATOR);
        if char_len(&prompt) > self.limit {
            prompt = truncate_chars(&prompt, self.limit).to_string();
        }

        reductions.omitted_paths = omitted.iter().map(|&i| changes[i].path.clone()).collect();
        (prompt, reductions)
    }
}

/// Shrink the diff shown in `section` until the whole prompt fits `limit`.
fn fit_diff(
    tally: &mut Tally,
    section: &mut Section,
    diff: &str,
    limit: usize,
    render: impl Fn(DiffShown) -> String,
) {
    let bare = char_len(&render(DiffShown::Truncated(0)));
    let overhead = tally.total() - section.chars + bare;
    let budget = limit.saturating_sub(overhead).min(char_len(diff));
    tally.replace(section, render(DiffShown::Truncated(budget)));
}

/// Index of the change with the largest diff; the first one wins ties.
fn primary_index(changes: &[StagedChange]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, change) in changes.iter().enumerate() {
        let len = change.diff_len();
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((i, len));
        }
    }
    best.map(|(i, _)| i)
}

fn has_contents(snapshot: &RepoSnapshot) -> bool {
    snapshot.changes.iter().any(|c| c.content.is_some())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Longest prefix of `s` with at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

fn render_template(template: &ResolvedTemplate) -> String {
    format!(
        "## Project commit template ({})\nFollow the conventions this template describes.\n\n{}",
        template.source,
        capped(&template.content, MAX_TEMPLATE_CHARS).trim_end()
    )
}

fn render_extra(extra: &str) -> String {
    format!(
        "## Additional context from the user\n{}",
        capped(extra, MAX_EXTRA_CONTEXT_CHARS).trim()
    )
}

fn render_state(snapshot: &RepoSnapshot) -> String {
    let mut lines = vec!["## Repository state".to_string(), snapshot.branch.describe()];
    if snapshot.initial_commit {
        lines.push("This will be the initial commit.".to_string());
    }
    if snapshot.auto_staged {
        lines.push("Tracked modified files are staged automatically (-a).".to_string());
    }

    if snapshot.changes.is_empty() {
        lines.push("No file changes are staged.".to_string());
    } else {
        lines.push("Changes to be committed:".to_string());
        lines.extend(
            snapshot
                .changes
                .iter()
                .take(MAX_STATUS_LINES)
                .map(|c| format!("  {}", long_status_line(&c.kind, &c.path))),
        );
        if snapshot.changes.len() > MAX_STATUS_LINES {
            lines.push(format!("  ... and {} more", snapshot.changes.len() - MAX_STATUS_LINES));
        }
    }

    lines.join("\n")
}

fn render_diff(diff: &str, shown: DiffShown) -> Option<String> {
    let text = match shown {
        DiffShown::Full => diff.trim_end().to_string(),
        DiffShown::Truncated(limit) => {
            let mut text = truncate_chars(diff, limit).trim_end().to_string();
            text.push_str(TRUNCATION_MARKER);
            text
        }
        DiffShown::Hidden => return None,
    };
    Some(format!("```diff\n{text}\n```"))
}

fn render_change(change: &StagedChange, include_contents: bool, shown: DiffShown) -> String {
    let mut section = format!("### {} ({})", change.path, change.kind);

    if let Some(info) = &change.binary_info {
        section.push_str(&format!("\n{}", info.marker()));
        return section;
    }

    if let Some(diff) = change.diff.as_deref().and_then(|d| render_diff(d, shown)) {
        section.push_str(&format!("\n{diff}"));
    }

    if include_contents && let Some(content) = &change.content {
        section.push_str(&format!("\nFull staged content:\n```\n{}\n```", content.trim_end()));
    }
    if change.content_omitted {
        section.push_str(&format!(
            "\n(full content omitted: larger than {} KB)",
            MAX_FILE_CONTENT_BYTES / 1024
        ));
    }

    section
}

fn render_amend(amend: &AmendContext, shown: DiffShown) -> String {
    let mut section = format!(
        "## Previous commit (historical context)\n\
         You are amending this commit. Write one message that describes the\n\
         previous commit's changes together with any newly staged changes.\n\n\
         ### Previous message\n{}",
        capped(&amend.message, MAX_PREVIOUS_MESSAGE_CHARS).trim_end()
    );
    if !amend.diff.is_empty()
        && let Some(diff) = render_diff(&amend.diff, shown)
    {
        section.push_str(&format!("\n\n### Previous diff\n{diff}"));
    }
    section
}

fn omitted_line(change: &StagedChange) -> String {
    format!("- {} ({})", change.path, change.kind)
}

fn omitted_more_line(count: usize) -> String {
    format!("- ... and {count} more")
}

fn render_omitted(omitted: &[&StagedChange]) -> String {
    let mut lines = vec![OMITTED_HEADER.to_string()];
    lines.extend(omitted.iter().take(MAX_OMITTED_LISTED).map(|c| omitted_line(c)));
    if omitted.len() > MAX_OMITTED_LISTED {
        lines.push(omitted_more_line(omitted.len() - MAX_OMITTED_LISTED));
    }
    lines.join("\n")
}

/// Length of [`render_omitted`] for `omitted`, from precomputed line lengths.
fn omitted_section_chars(omitted: &VecDeque<usize>, line_chars: &[usize]) -> usize {
    let listed: usize = omitted
        .iter()
        .take(MAX_OMITTED_LISTED)
        .map(|&i| 1 + line_chars[i])
        .sum();
    let more = if omitted.len() > MAX_OMITTED_LISTED {
        1 + char_len(&omitted_more_line(omitted.len() - MAX_OMITTED_LISTED))
    } else {
        0
    };
    char_len(OMITTED_HEADER) + listed + more
}

fn capped(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        text.to_string()
    } else {
        format!("{}\n[... truncated ...]", truncate_chars(text, max))
    }
}
