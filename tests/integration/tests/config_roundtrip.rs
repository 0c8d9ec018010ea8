//! Config file loading and override precedence.

use std::path::Path;

use envkeep_core::{BackendDriver, Config, ConfigError};
use envkeep_integration_tests::Workspace;

#[test]
fn test_written_config_loads_back() {
    let ws = Workspace::new();
    let path = ws.write_config("billing");

    let loaded = Config::load(&path).unwrap();
    let expected = ws.config("billing");
    assert_eq!(loaded.project, "billing");
    assert_eq!(loaded.driver, BackendDriver::Sqlite);
    assert_eq!(loaded.connection_string, expected.connection_string);
    assert_eq!(loaded.encryption_key, expected.encryption_key);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_environment_overrides_file() {
    let ws = Workspace::new();
    let mut config = Config::load(&ws.write_config("billing")).unwrap();

    config
        .apply_overrides(|name| match name {
            "ENVKEEP_PROJECT" => Some("payroll".to_string()),
            "ENVKEEP_DB_DRIVER" => Some("pgx".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.project, "payroll");
    assert_eq!(config.driver, BackendDriver::Postgres);
}

#[test]
fn test_driver_aliases_parse() {
    let config = Config::parse(r#"{ driver: "sqlite3" }"#).unwrap();
    assert_eq!(config.driver, BackendDriver::Sqlite);
    assert_eq!(config.project, "*");

    let config = Config::parse(r#"{ driver: "postgresql" }"#).unwrap();
    assert_eq!(config.driver, BackendDriver::Postgres);
}

#[test]
fn test_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/envkeep.json5"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_parse_invalid() {
    assert!(matches!(
        Config::parse("not valid json5"),
        Err(ConfigError::Json5(_))
    ));
}
