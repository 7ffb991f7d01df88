//! Token handling around a real clone.
//!
//! Lives in its own binary because it points git at a private global config
//! for the whole process.

mod common;

use std::fs;

use common::{git, project, Remote};
use hookdeploy::deploy::git::Git;
use hookdeploy::deploy::sync::RepoSynchronizer;
use hookdeploy::filesys::dir::Dir;
use hookdeploy::models::deployment::SyncDecision;
use secrecy::SecretString;

const REPO: &str = "https://git.example.com/acme/site.git";
const TOKEN: &str = "tok3n";

#[tokio::test]
async fn test_token_is_not_stored_in_the_working_copy() {
    let remote = Remote::new();

    // Route the https remote, with and without userinfo, to the local bare repo.
    let gitconfig = remote.root.path().join("gitconfig");
    fs::write(
        &gitconfig,
        format!(
            "[url \"{bare}\"]\n\tinsteadOf = {repo}\n\tinsteadOf = https://{token}@git.example.com/acme/site.git\n",
            bare = remote.url(),
            repo = REPO,
            token = TOKEN,
        ),
    )
    .unwrap();
    std::env::set_var("GIT_CONFIG_GLOBAL", &gitconfig);

    let apps = tempfile::tempdir().unwrap();
    let sync = RepoSynchronizer::new(Git::default(), Dir::new(apps.path()));
    let mut site = project("site", REPO, None, &[]);
    site.token = Some(SecretString::from(TOKEN.to_string()));
    assert!(site.authenticated_url().contains(TOKEN));

    let outcome = sync.ensure_up_to_date(&site).await.unwrap();
    assert_eq!(outcome.decision, SyncDecision::Clone);
    let path = outcome.working_dir.path().to_path_buf();
    assert_eq!(git(&path, &["rev-parse", "HEAD"]), remote.tip("main"));

    // The raw config value, before any insteadOf rewriting.
    assert_eq!(git(&path, &["config", "--get", "remote.origin.url"]), REPO);
    let config = fs::read_to_string(path.join(".git").join("config")).unwrap();
    assert!(!config.contains(TOKEN), "token leaked into .git/config:\n{}", config);

    // Later fetches still authenticate through the injected URL.
    let again = sync.ensure_up_to_date(&site).await.unwrap();
    assert_eq!(again.decision, SyncDecision::FetchNoOp);
    let config = fs::read_to_string(path.join(".git").join("config")).unwrap();
    assert!(!config.contains(TOKEN));
}
