//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate POLLWATCH_ROOT_FOLDER are marked with #[serial]
//! so they never race each other on the process environment.

use pollwatch_common::config::{
    database_path, default_root_folder, resolve_root_folder, ServerConfig, ROOT_FOLDER_ENV,
};
use pollwatch_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 5780);
    assert_eq!(config.bind_addr, "0.0.0.0");
    assert_eq!(config.client_buffer, 64);
    assert_eq!(config.stream_stale_after_secs, 60);
    assert_eq!(config.page_size, 50);
    assert!(config.root_folder.is_none());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let config = ServerConfig::load(Some(Path::new("/nonexistent/pollwatch.toml"))).unwrap();
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = ServerConfig::from_toml("port = 8080\nclient_buffer = 8\n").unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.client_buffer, 8);
    assert_eq!(config.page_size, 50);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pollwatch.toml");
    std::fs::write(&path, "root_folder = \"/srv/pollwatch\"\nport = 9000\n").unwrap();

    let config = ServerConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/pollwatch")));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = ServerConfig::from_toml("port = \"not a number\"");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_zero_client_buffer_rejected() {
    let result = ServerConfig::from_toml("client_buffer = 0");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/pollwatch-env");
    let config = ServerConfig {
        root_folder: Some(PathBuf::from("/tmp/pollwatch-toml")),
        ..ServerConfig::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/tmp/pollwatch-cli")), ROOT_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/pollwatch-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/pollwatch-env");
    let config = ServerConfig {
        root_folder: Some(PathBuf::from("/tmp/pollwatch-toml")),
        ..ServerConfig::default()
    };

    let resolved = resolve_root_folder(None, ROOT_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/pollwatch-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = ServerConfig {
        root_folder: Some(PathBuf::from("/tmp/pollwatch-toml")),
        ..ServerConfig::default()
    };
    assert_eq!(
        resolve_root_folder(None, ROOT_FOLDER_ENV, &config),
        PathBuf::from("/tmp/pollwatch-toml")
    );

    let resolved = resolve_root_folder(None, ROOT_FOLDER_ENV, &ServerConfig::default());
    assert_eq!(resolved, default_root_folder());
}

#[test]
fn test_database_path() {
    assert_eq!(
        database_path(Path::new("/srv/pollwatch")),
        PathBuf::from("/srv/pollwatch/pollwatch.db")
    );
}
