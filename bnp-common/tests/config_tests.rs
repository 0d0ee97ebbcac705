//! Tests for bootstrap configuration resolution
//!
//! Covers:
//! - Explicit TOML file values
//! - Command-line overrides winning over TOML values
//! - Missing/invalid explicit files reported as configuration errors

use bnp_common::config::{BootstrapConfig, BootstrapOverrides, DEFAULT_BIND_ADDR};
use bnp_common::Error;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_explicit_toml_file_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
base_path = "/srv/BirdNET-Pi"
settings_path = "/srv/birdnet.conf"
bind_addr = "0.0.0.0:8081"

[logging]
level = "debug"
"#,
    );

    let overrides = BootstrapOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = BootstrapConfig::resolve(&overrides).unwrap();

    assert_eq!(config.base_path, PathBuf::from("/srv/BirdNET-Pi"));
    assert_eq!(config.settings_path, PathBuf::from("/srv/birdnet.conf"));
    assert_eq!(config.database_path, PathBuf::from("/srv/BirdNET-Pi/scripts/birds.db"));
    assert_eq!(config.image_cache_path, PathBuf::from("/srv/BirdNET-Pi/scripts/image_cache.db"));
    assert_eq!(config.bind_addr, "0.0.0.0:8081");
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_overrides_beat_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "base_path = \"/from/toml\"\ndatabase_path = \"/from/toml/birds.db\"\n");

    let overrides = BootstrapOverrides {
        config_file: Some(path),
        base_path: Some(PathBuf::from("/from/cli")),
        database_path: Some(PathBuf::from("/from/cli/birds.db")),
        ..Default::default()
    };
    let config = BootstrapConfig::resolve(&overrides).unwrap();

    assert_eq!(config.base_path, PathBuf::from("/from/cli"));
    assert_eq!(config.database_path, PathBuf::from("/from/cli/birds.db"));
    assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
}

#[test]
fn test_missing_explicit_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let overrides = BootstrapOverrides {
        config_file: Some(dir.path().join("nope.toml")),
        ..Default::default()
    };
    assert!(matches!(BootstrapConfig::resolve(&overrides), Err(Error::Config(_))));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "base_path = [unclosed");
    let overrides = BootstrapOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    assert!(matches!(BootstrapConfig::resolve(&overrides), Err(Error::Config(_))));
}
