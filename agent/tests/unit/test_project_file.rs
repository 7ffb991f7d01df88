//! Project file tests

use hookdeploy::errors::AgentError;
use hookdeploy::filesys::file::File;
use hookdeploy::models::project::ProjectConfig;
use hookdeploy::storage::project_file::load_project;
use secrecy::ExposeSecret;

async fn load(name: &str, contents: &str) -> Result<ProjectConfig, AgentError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("{}.ini", name));
    tokio::fs::write(&path, contents).await.unwrap();
    load_project(&File::new(path)).await
}

#[tokio::test]
async fn test_load_full_project() {
    let project = load(
        "site",
        "repo = https://github.com/acme/site.git\n\
         token = ghp_secret\n\
         branch = production\n\
         run = ['npm ci', 'npm run build']\n",
    )
    .await
    .unwrap();

    assert_eq!(project.name, "site");
    assert_eq!(project.repo, "https://github.com/acme/site.git");
    assert_eq!(project.target_branch(), "production");
    assert_eq!(project.run, vec!["npm ci", "npm run build"]);
    assert_eq!(project.token.as_ref().unwrap().expose_secret(), "ghp_secret");
}

#[tokio::test]
async fn test_token_is_not_debug_printed() {
    let project = load("site", "repo = https://github.com/acme/site.git\ntoken = ghp_secret\n")
        .await
        .unwrap();
    assert!(!format!("{:?}", project).contains("ghp_secret"));
}

#[tokio::test]
async fn test_empty_branch_falls_back_to_main() {
    let project = load("api", "repo = https://example.com/api.git\nbranch =\n")
        .await
        .unwrap();
    assert_eq!(project.target_branch(), "main");
}

#[tokio::test]
async fn test_commands_keep_backslashes_and_apostrophes() {
    let project = load(
        "api",
        r#"repo = https://example.com/api.git
run = ["make build && make install", "grep -E '\\d+' build.log"]
"#,
    )
    .await
    .unwrap();
    assert_eq!(
        project.run,
        vec!["make build && make install", r"grep -E '\d+' build.log"]
    );
}

#[tokio::test]
async fn test_malformed_run_list_is_config_error() {
    let err = load("api", "repo = https://example.com/api.git\nrun = npm ci\n")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::ConfigError(_)));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_project(&File::new(dir.path().join("gone.ini")))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::IoError(_)));
}
