//! Configuration loading from the process environment.
//!
//! These tests mutate environment variables, so they run serially.

use std::env;
use std::path::PathBuf;

use agent_repack::config::{Config, ConfigOverrides, DEFAULT_SOURCES_LIST};
use serial_test::serial;
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "REPO_HOST",
    "APP_HOST",
    "PACKAGES",
    "CACHE_DIR",
    "OUTPUT_DIR",
    "CODENAME",
    "SOURCES_LIST",
    "USE_SUDO",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_load_reads_environment() {
    clear_env();
    let base = TempDir::new().unwrap();
    env::set_var("PACKAGES", "stackdriver-agent,stackdriver-extractor");
    env::set_var("CACHE_DIR", "work");
    env::set_var("CODENAME", "bionic");
    env::set_var("USE_SUDO", "false");

    let config = Config::load(base.path()).unwrap();
    clear_env();

    assert_eq!(
        config.packages,
        vec!["stackdriver-agent", "stackdriver-extractor"]
    );
    assert_eq!(config.cache_dir, base.path().join("work"));
    assert_eq!(config.output_dir, base.path().join("work"));
    assert_eq!(config.codename.as_deref(), Some("bionic"));
    assert!(!config.repo.use_sudo);
    assert_eq!(config.repo.sources_list, PathBuf::from(DEFAULT_SOURCES_LIST));
}

#[test]
#[serial]
fn test_cli_overrides_beat_environment() {
    clear_env();
    let base = TempDir::new().unwrap();
    env::set_var("REPO_HOST", "mirror.internal");
    env::set_var("PACKAGES", "stackdriver-agent");

    let config = Config::load(base.path())
        .and_then(|c| {
            c.apply(
                base.path(),
                ConfigOverrides {
                    repo_host: Some("repo.override".to_string()),
                    packages: vec!["agent".to_string()],
                    output_dir: Some(PathBuf::from("/srv/releases")),
                    ..Default::default()
                },
            )
        })
        .unwrap();
    clear_env();

    assert_eq!(config.repo.repo_host, "repo.override");
    assert_eq!(config.packages, vec!["agent"]);
    assert_eq!(config.output_dir, PathBuf::from("/srv/releases"));
}

#[test]
#[serial]
fn test_blank_values_fall_back_to_defaults() {
    clear_env();
    let base = TempDir::new().unwrap();
    env::set_var("REPO_HOST", "  ");
    env::set_var("PACKAGES", "");

    let config = Config::load(base.path()).unwrap();
    clear_env();

    assert_eq!(config.repo.repo_host, "repo.stackdriver.com");
    assert_eq!(config.packages, vec!["stackdriver-agent"]);
}
