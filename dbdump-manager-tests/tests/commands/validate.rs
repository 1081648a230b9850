//! Tests for the 'validate' command
//!
//! The validate command checks configuration file syntax and validity.

use dbdump_manager::config::{load_config, resolve_all_models};
use dbdump_manager::PerformerRegistry;
use test_utils::{ConfigBuilder, TestContext};

#[test]
fn test_validate_valid_config() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let config_path = ctx.write_config().unwrap();

    let result = load_config(&config_path);
    assert!(result.is_ok(), "Valid config should pass validation");

    let loaded = result.unwrap();
    assert_eq!(loaded.models.len(), 1);
    assert!(resolve_all_models(&loaded).is_ok());
}

#[test]
fn test_validate_multiple_models() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_database("hourly", "cache", "redis")
            .add_database("weekly", "warehouse", "postgresql"),
    );
    let config_path = ctx.write_config().unwrap();

    let loaded = load_config(&config_path).unwrap();
    assert_eq!(loaded.models.len(), 3);
}

#[test]
fn test_validate_invalid_toml() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("config.toml", "invalid { toml content");

    let result = load_config(&config_path);
    assert!(result.is_err(), "Invalid TOML should fail");
}

#[test]
fn test_validate_missing_file() {
    let ctx = TestContext::new();
    let result = load_config(ctx.temp_dir().join("nope.toml"));
    assert!(result.is_err());
}

#[test]
fn test_validate_flags_unsupported_types() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal().add_database("daily", "events", "clickhouse"),
    );
    let config = load_config(ctx.write_config().unwrap()).unwrap();
    let registry = PerformerRegistry::with_builtin();

    let unsupported: Vec<_> = config.models["daily"]
        .databases
        .iter()
        .filter(|d| !registry.contains(&d.db_type))
        .map(|d| d.name.as_str())
        .collect();

    // Unsupported types are a warning, not a validation error
    assert_eq!(unsupported, vec!["events"]);
}
