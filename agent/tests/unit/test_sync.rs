//! Repository synchronizer tests against local bare remotes

mod common;

use std::fs;

use common::{git, project, Remote};
use hookdeploy::deploy::git::Git;
use hookdeploy::deploy::sync::RepoSynchronizer;
use hookdeploy::errors::AgentError;
use hookdeploy::filesys::dir::Dir;
use hookdeploy::models::deployment::SyncDecision;

fn synchronizer(apps_dir: &std::path::Path) -> RepoSynchronizer {
    RepoSynchronizer::new(Git::default(), Dir::new(apps_dir))
}

#[tokio::test]
async fn test_absent_working_copy_is_cloned() {
    let remote = Remote::new();
    let apps = tempfile::tempdir().unwrap();
    // The apps root itself does not exist yet.
    let sync = synchronizer(&apps.path().join("apps"));
    let site = project("site", &remote.url(), None, &[]);

    let outcome = sync.ensure_up_to_date(&site).await.unwrap();

    assert_eq!(outcome.decision, SyncDecision::Clone);
    let path = outcome.working_dir.path();
    assert!(path.join(".git").exists());
    assert_eq!(git(path, &["rev-parse", "HEAD"]), remote.tip("main"));
    assert_eq!(outcome.head.as_deref(), Some(remote.tip("main").as_str()));
}

#[tokio::test]
async fn test_behind_working_copy_is_fast_forwarded() {
    let mut remote = Remote::new();
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());
    let site = project("site", &remote.url(), Some("main"), &[]);

    sync.ensure_up_to_date(&site).await.unwrap();
    remote.commit("main", "second");
    remote.commit("main", "third");

    let outcome = sync.ensure_up_to_date(&site).await.unwrap();

    assert_eq!(outcome.decision, SyncDecision::FetchThenPull { behind: 2 });
    assert_eq!(git(outcome.working_dir.path(), &["rev-parse", "HEAD"]), remote.tip("main"));
}

#[tokio::test]
async fn test_up_to_date_working_copy_is_left_alone() {
    let remote = Remote::new();
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());
    let site = project("site", &remote.url(), None, &[]);

    let first = sync.ensure_up_to_date(&site).await.unwrap();
    let untracked = first.working_dir.path().join("build-output.txt");
    fs::write(&untracked, "artifact").unwrap();

    let second = sync.ensure_up_to_date(&site).await.unwrap();

    assert_eq!(second.decision, SyncDecision::FetchNoOp);
    assert_eq!(second.head, first.head);
    assert!(untracked.exists());
}

#[tokio::test]
async fn test_corrupt_working_copy_is_recloned() {
    let remote = Remote::new();
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());
    let site = project("site", &remote.url(), None, &[]);

    let leftover = apps.path().join("site");
    fs::create_dir_all(&leftover).unwrap();
    fs::write(leftover.join("half-written"), "x").unwrap();

    let outcome = sync.ensure_up_to_date(&site).await.unwrap();
    assert_eq!(outcome.decision, SyncDecision::Clone);
    assert!(!leftover.join("half-written").exists());
    assert!(leftover.join(".git").exists());

    // A second pass finds a healthy repository.
    let again = sync.ensure_up_to_date(&site).await.unwrap();
    assert_eq!(again.decision, SyncDecision::FetchNoOp);
}

#[tokio::test]
async fn test_changed_target_branch_is_checked_out() {
    let mut remote = Remote::new();
    remote.commit("dev", "dev work");
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());

    let on_main = project("site", &remote.url(), Some("main"), &[]);
    sync.ensure_up_to_date(&on_main).await.unwrap();

    let on_dev = project("site", &remote.url(), Some("dev"), &[]);
    let outcome = sync.ensure_up_to_date(&on_dev).await.unwrap();

    assert_eq!(outcome.decision, SyncDecision::SwitchBranch);
    let path = outcome.working_dir.path();
    assert_eq!(git(path, &["rev-parse", "--abbrev-ref", "HEAD"]), "dev");
    assert_eq!(git(path, &["rev-parse", "HEAD"]), remote.tip("dev"));

    let again = sync.ensure_up_to_date(&on_dev).await.unwrap();
    assert_eq!(again.decision, SyncDecision::FetchNoOp);
}

#[tokio::test]
async fn test_unreachable_remote_is_clone_error() {
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());
    let missing = apps.path().join("no-such-remote.git");
    let site = project("site", missing.to_str().unwrap(), None, &[]);

    let err = sync.ensure_up_to_date(&site).await.unwrap_err();
    assert!(matches!(err, AgentError::CloneError(_)));
}

#[tokio::test]
async fn test_missing_branch_on_existing_copy_is_fetch_error() {
    let remote = Remote::new();
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());

    sync.ensure_up_to_date(&project("site", &remote.url(), None, &[]))
        .await
        .unwrap();
    let err = sync
        .ensure_up_to_date(&project("site", &remote.url(), Some("nope"), &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::FetchError(_)));
}

#[tokio::test]
async fn test_clone_error_does_not_leak_token() {
    let apps = tempfile::tempdir().unwrap();
    let sync = synchronizer(apps.path());
    // Nothing listens on port 1, so the clone fails fast.
    let mut site = project("site", "https://127.0.0.1:1/acme/site.git", None, &[]);
    site.token = Some("tok3n".to_string().into());

    let err = sync.ensure_up_to_date(&site).await.unwrap_err();

    assert!(matches!(err, AgentError::CloneError(_)));
    assert!(!err.to_string().contains("tok3n"));
}
