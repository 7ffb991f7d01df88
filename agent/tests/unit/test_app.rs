//! Application state tests

mod common;

use common::write_project_file;
use hookdeploy::app::options::DeployOptions;
use hookdeploy::app::state::AppState;

#[tokio::test]
async fn test_projects_are_loaded_before_init_returns() {
    let root = tempfile::tempdir().unwrap();
    let config_dir = root.path().join("repos");
    std::fs::create_dir_all(&config_dir).unwrap();
    write_project_file(&config_dir, "site", "repo = https://example.com/site.git\n");

    let options = DeployOptions {
        config_dir,
        apps_dir: root.path().join("apps"),
        ..Default::default()
    };
    let state = AppState::init(&options).await.unwrap();

    assert_eq!(state.registry.names(), vec!["site"]);
    assert!(state.orchestrator.match_push("site", "refs/heads/main").is_ok());
    assert!(root.path().join("apps").is_dir());
}

#[tokio::test]
async fn test_missing_dirs_are_created_with_an_empty_registry() {
    let root = tempfile::tempdir().unwrap();
    let options = DeployOptions {
        config_dir: root.path().join("repos"),
        apps_dir: root.path().join("apps"),
        ..Default::default()
    };

    let state = AppState::init(&options).await.unwrap();

    assert!(state.registry.is_empty());
    assert!(root.path().join("repos").is_dir());
}
