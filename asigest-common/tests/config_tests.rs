//! Tests for bootstrap configuration loading
//!
//! - Missing TOML files do not prevent startup (defaults apply)
//! - Values from an existing TOML file are honored
//! - Malformed TOML is reported as a configuration error

use asigest_common::config::{load_toml_config, Overrides, Settings};
use asigest_common::Error;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_toml_config(Some(&path)).expect("Missing file must not be fatal");

    assert_eq!(config.server.port, 8000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_file_values_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
path = "/srv/asigest/asi_gest.db"
erp_path = "/srv/asigest/asitron.db"

[cors]
origins = ["http://plant.local"]

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    let settings = Settings::resolve(config, Overrides::default());

    assert_eq!(settings.host, "127.0.0.1");
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.db_path, PathBuf::from("/srv/asigest/asi_gest.db"));
    assert_eq!(settings.erp_db_path, PathBuf::from("/srv/asigest/asitron.db"));
    assert_eq!(settings.cors_origins, vec!["http://plant.local".to_string()]);
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

    let result = load_toml_config(Some(&path));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_cli_override_beats_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    let settings = Settings::resolve(
        config,
        Overrides {
            log_level: Some("trace".to_string()),
            ..Default::default()
        },
    );

    assert_eq!(settings.log_level, "trace");
}
