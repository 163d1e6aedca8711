//! Integration tests for layered configuration loading

use crate::integration::test_utils::with_env;
use livequery::config::ConfigLoader;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    with_env(&test_dir, &[], || {
        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert!(config.endpoint.url.is_none());
        assert_eq!(config.auth.token_ttl_ms, 10_000);
        assert!(config.validate().is_ok());
    });
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    with_env(&test_dir, &[], || {
        let global = ConfigLoader::global_config_path().unwrap();
        write(
            &global,
            r#"
[endpoint]
url = "https://global.convex.cloud"

[auth]
site_url = "http://localhost:3000"
"#,
        );
        write(
            &workspace.path().join("livequery.toml"),
            r#"
[endpoint]
url = "https://workspace.convex.cloud"
"#,
        );

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(
            config.endpoint.url.as_deref(),
            Some("https://workspace.convex.cloud")
        );
        assert_eq!(config.auth.site_url.as_deref(), Some("http://localhost:3000"));
    });
}

#[test]
fn test_environment_file_selected_by_env_name() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("livequery.toml"),
        "[query]\nsubscribe = true\n",
    );
    write(
        &workspace.path().join("config").join("staging.toml"),
        "[query]\nsubscribe = false\n",
    );

    with_env(&test_dir, &[("LIVEQUERY_ENV", "staging")], || {
        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert!(!config.query.subscribe);
    });
    with_env(&test_dir, &[], || {
        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert!(config.query.subscribe);
    });
}

#[test]
fn test_environment_variables_win() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("livequery.toml"),
        "[endpoint]\nurl = \"https://workspace.convex.cloud\"\n",
    );

    with_env(
        &test_dir,
        &[
            ("LIVEQUERY_ENDPOINT__URL", "https://env.convex.cloud"),
            ("LIVEQUERY_AUTH__TOKEN_TTL_MS", "2500"),
        ],
        || {
            let config = ConfigLoader::load(workspace.path()).unwrap();
            assert_eq!(config.endpoint.url.as_deref(), Some("https://env.convex.cloud"));
            assert_eq!(config.auth.token_ttl_ms, 2500);
        },
    );
}

#[test]
fn test_invalid_values_are_reported_together() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("livequery.toml"),
        r#"
[endpoint]
url = "convex.cloud"

[auth]
token_ttl_ms = 0
"#,
    );
    with_env(&test_dir, &[], || {
        let config = ConfigLoader::load(workspace.path()).unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    });
}
