//! End-to-end tests for one invocation against a real git repository.
//!
//! The provider and the editor are replaced by stubs; git is the real binary.

mod common;

use std::path::PathBuf;

use common::{StubClient, StubEditor, TestRepo};
use git_commitai::{
    AbortReason, CommitFlags, CommitOptions, CommitResult, Error, GitError, ProviderError,
    ProviderOverrides, Workflow,
};

fn options(flags: CommitFlags) -> CommitOptions {
    CommitOptions {
        flags,
        provider: ProviderOverrides {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn run(
    repo: &TestRepo,
    client: &StubClient,
    editor: &StubEditor,
    options: &CommitOptions,
) -> Result<CommitResult, Error> {
    run_with_home(repo, client, editor, options, None).await
}

async fn run_with_home(
    repo: &TestRepo,
    client: &StubClient,
    editor: &StubEditor,
    options: &CommitOptions,
    home: Option<PathBuf>,
) -> Result<CommitResult, Error> {
    let git = repo.git();
    Workflow::new(&git)
        .with_client(client)
        .with_editor(editor)
        .with_template_home(home)
        .run(options)
        .await
}

#[tokio::test]
async fn test_nothing_staged_reports_like_git() {
    let repo = TestRepo::new();
    repo.commit_file("README.md", "hello\n", "Initial commit");
    repo.write("notes.txt", "scratch\n");

    let client = StubClient::replying("unused");
    let editor = StubEditor::accepting();
    let err = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap_err();

    let Error::Git(GitError::NoStagedChanges { report }) = &err else {
        panic!("expected NoStagedChanges, got {err:?}");
    };
    assert!(report.starts_with("On branch main"));
    assert!(report.contains("Untracked files:"));
    assert!(report.contains("\tnotes.txt"));
    assert!(report.ends_with(
        "nothing added to commit but untracked files present (use \"git add\" to track)"
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(client.request_count(), 0);
    assert!(!editor.was_launched());
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_single_staged_file_accepted_unchanged() {
    let repo = TestRepo::new();
    repo.add("README.md", "# Project\n");

    let client = StubClient::replying("Add project README");
    let editor = StubEditor::accepting();
    let result = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.message.as_deref(), Some("Add project README"));
    assert_eq!(repo.head_message().as_deref(), Some("Add project README\n"));
    assert_eq!(repo.commit_count(), 1);

    let buffer = editor.seen();
    assert!(buffer.starts_with("Add project README\n\n"));
    assert!(buffer.contains("# On branch main\n"));
    assert!(buffer.contains("# Initial commit\n"));
    assert!(buffer.contains("# Changes to be committed:\n"));
    assert!(buffer.contains("#\tnew file:   README.md\n"));

    assert!(client.last_prompt().contains("README.md"));
    assert!(client.last_prompt().contains("# Project"));
}

#[tokio::test]
async fn test_edited_message_is_committed() {
    let repo = TestRepo::new();
    repo.commit_file("src/lib.rs", "fn a() {}\n", "Initial commit");
    repo.add("src/lib.rs", "fn a() {}\nfn b() {}\n");

    let client = StubClient::replying("Add b");
    let editor = StubEditor::rewriting(
        "Add helper b\n\nUsed by the parser.\n# Please enter the commit message\n",
    );
    let result = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(
        repo.head_message().as_deref(),
        Some("Add helper b\n\nUsed by the parser.\n")
    );
}

#[tokio::test]
async fn test_warning_comments_are_not_committed() {
    let repo = TestRepo::new();
    repo.add("docs/guide.md", "Teh guide\n");

    let client = StubClient::replying(
        "Add user guide\n\n# ⚠️  WARNING: Possible typo 'Teh' in docs/guide.md\n",
    );
    let editor = StubEditor::accepting();
    run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();

    assert!(editor.seen().contains("# ⚠️  WARNING: Possible typo"));
    assert_eq!(repo.head_message().as_deref(), Some("Add user guide\n"));
}

#[tokio::test]
async fn test_cleared_buffer_aborts_without_commit() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "Initial commit");
    repo.add("a.txt", "b\n");

    let client = StubClient::replying("Change a");
    let editor = StubEditor::rewriting("# nothing left\n");
    let result = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert_eq!(result.message, None);
    assert_eq!(result.abort_reason, Some(AbortReason::EmptyMessage));
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_editor_failure_aborts_without_commit() {
    let repo = TestRepo::new();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::failing(2);
    let result = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert_eq!(result.abort_reason, Some(AbortReason::EditorFailed { status: 2 }));
    assert_eq!(repo.commit_count(), 0);
}

#[tokio::test]
async fn test_amend_without_head_is_fatal() {
    let repo = TestRepo::new();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("unused");
    let editor = StubEditor::accepting();
    let flags = CommitFlags {
        amend: true,
        ..Default::default()
    };
    let err = run(&repo, &client, &editor, &options(flags)).await.unwrap_err();

    assert!(matches!(err, Error::Git(GitError::NothingToAmend)));
    assert_eq!(err.exit_code(), 128);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_amend_rewrites_previous_commit() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "Initial commit");
    repo.commit_file("b.txt", "b\n", "Add b");
    repo.add("c.txt", "c\n");

    let client = StubClient::replying("Add b and c");
    let editor = StubEditor::accepting();
    let flags = CommitFlags {
        amend: true,
        ..Default::default()
    };
    let result = run(&repo, &client, &editor, &options(flags)).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.amended);
    assert_eq!(repo.commit_count(), 2);
    assert_eq!(repo.head_message().as_deref(), Some("Add b and c\n"));

    let buffer = editor.seen();
    assert!(buffer.contains("You are amending the previous commit."));
    assert!(buffer.contains("#\tnew file:   b.txt\n"));
    assert!(buffer.contains("#\tnew file:   c.txt\n"));
    assert!(client.last_prompt().contains("Add b"));
}

#[tokio::test]
async fn test_empty_provider_response_exits_with_provider_code() {
    let repo = TestRepo::new();
    repo.add("a.txt", "a\n");

    let client = StubClient::empty();
    let editor = StubEditor::accepting();
    let err = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider(ProviderError::EmptyResponse)));
    assert_eq!(err.exit_code(), 3);
    assert!(!editor.was_launched());
    assert_eq!(repo.commit_count(), 0);
}

#[tokio::test]
async fn test_extra_context_reaches_prompt_only() {
    let repo = TestRepo::new();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::accepting();
    let options = CommitOptions {
        extra_context: Some("Fixes the login redirect loop".to_string()),
        ..options(CommitFlags::default())
    };
    run(&repo, &client, &editor, &options).await.unwrap();

    assert!(client.last_prompt().contains("Fixes the login redirect loop"));
    assert_eq!(repo.head_message().as_deref(), Some("Add a\n"));
}

#[tokio::test]
async fn test_repository_template_wins_over_config_and_home() {
    let repo = TestRepo::new();
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join(".gitmessage"), "HOME TEMPLATE\n").unwrap();
    repo.write("config-template.txt", "CONFIG TEMPLATE\n");
    repo.repo
        .config()
        .unwrap()
        .set_str("commit.template", "config-template.txt")
        .unwrap();
    repo.write(".gitmessage", "REPO TEMPLATE\n");
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::accepting();
    run_with_home(
        &repo,
        &client,
        &editor,
        &options(CommitFlags::default()),
        Some(home.path().to_path_buf()),
    )
    .await
    .unwrap();

    let prompt = client.last_prompt();
    assert!(prompt.contains("REPO TEMPLATE"));
    assert!(!prompt.contains("CONFIG TEMPLATE"));
    assert!(!prompt.contains("HOME TEMPLATE"));
}

#[tokio::test]
async fn test_config_template_wins_over_home() {
    let repo = TestRepo::new();
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join(".gitmessage"), "HOME TEMPLATE\n").unwrap();
    repo.write("config-template.txt", "CONFIG TEMPLATE\n");
    repo.repo
        .config()
        .unwrap()
        .set_str("commit.template", "config-template.txt")
        .unwrap();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::accepting();
    run_with_home(
        &repo,
        &client,
        &editor,
        &options(CommitFlags::default()),
        Some(home.path().to_path_buf()),
    )
    .await
    .unwrap();

    let prompt = client.last_prompt();
    assert!(prompt.contains("CONFIG TEMPLATE"));
    assert!(!prompt.contains("HOME TEMPLATE"));
}

#[tokio::test]
async fn test_home_template_used_last() {
    let repo = TestRepo::new();
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join(".gitmessage"), "HOME TEMPLATE\n").unwrap();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::accepting();
    run_with_home(
        &repo,
        &client,
        &editor,
        &options(CommitFlags::default()),
        Some(home.path().to_path_buf()),
    )
    .await
    .unwrap();

    assert!(client.last_prompt().contains("HOME TEMPLATE"));
}

#[tokio::test]
async fn test_all_abort_leaves_index_untouched() {
    let repo = TestRepo::new();
    repo.commit_file("tracked.txt", "one\n", "Initial commit");
    repo.write("tracked.txt", "two\n");
    let index_before = repo.index_snapshot();

    let client = StubClient::replying("Update tracked");
    let editor = StubEditor::rewriting("");
    let flags = CommitFlags {
        all: true,
        ..Default::default()
    };
    let result = run(&repo, &client, &editor, &options(flags)).await.unwrap();

    assert_eq!(result.abort_reason, Some(AbortReason::EmptyMessage));
    assert_eq!(repo.index_snapshot(), index_before);
    assert_eq!(repo.commit_count(), 1);
    assert!(client.last_prompt().contains("tracked.txt"));
    assert!(editor.seen().contains("#\tmodified:   tracked.txt\n"));
}

#[tokio::test]
async fn test_all_commits_tracked_modifications() {
    let repo = TestRepo::new();
    repo.commit_file("tracked.txt", "one\n", "Initial commit");
    repo.write("tracked.txt", "two\n");
    repo.write("untracked.txt", "new\n");

    let client = StubClient::replying("Update tracked");
    let editor = StubEditor::accepting();
    let flags = CommitFlags {
        all: true,
        ..Default::default()
    };
    let result = run(&repo, &client, &editor, &options(flags)).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(repo.commit_count(), 2);
    assert_eq!(repo.head_message().as_deref(), Some("Update tracked\n"));
    assert!(!client.last_prompt().contains("untracked.txt (new file)"));
}

#[tokio::test]
async fn test_allow_empty_commits_without_changes() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "Initial commit");

    let client = StubClient::replying("Trigger CI");
    let editor = StubEditor::accepting();
    let flags = CommitFlags {
        allow_empty: true,
        ..Default::default()
    };
    let result = run(&repo, &client, &editor, &options(flags)).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(repo.commit_count(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_hook_exit_code_is_forwarded() {
    use std::os::unix::fs::PermissionsExt;

    let repo = TestRepo::new();
    let hook = repo.git_dir().join("hooks").join("pre-commit");
    std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
    std::fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("Add a");
    let editor = StubEditor::accepting();
    let result = run(&repo, &client, &editor, &options(CommitFlags::default()))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(repo.commit_count(), 0);

    let flags = CommitFlags {
        no_verify: true,
        ..Default::default()
    };
    let result = run(&repo, &client, &editor, &options(flags)).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_dry_run_skips_provider_and_editor() {
    let repo = TestRepo::new();
    repo.add("a.txt", "a\n");

    let client = StubClient::replying("unused");
    let editor = StubEditor::accepting();
    let options = CommitOptions {
        dry_run: true,
        ..options(CommitFlags::default())
    };
    let result = run(&repo, &client, &editor, &options).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(client.request_count(), 0);
    assert!(!editor.was_launched());
    assert_eq!(repo.commit_count(), 0);
}
