//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, validation, and model resolution.

use dbdump_manager::config::{load_config, resolve_all_models, ConfigError};
use std::fs;
use test_utils::{database_with, ConfigBuilder, TestContext};

#[test]
fn test_config_loading_valid() {
    let builder = ConfigBuilder::minimal().add_database("daily", "cache", "redis");
    let (config, temp_dir) = builder.persist();

    // Write config to file
    let config_path = temp_dir.path().join("config.toml");
    let toml_str = toml::to_string_pretty(&config).unwrap();
    fs::write(&config_path, toml_str).unwrap();

    // Load and verify
    let loaded = load_config(&config_path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let loaded_config = loaded.unwrap();
    let names: Vec<_> = loaded_config.models["daily"]
        .databases
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["app", "cache"]);
}

#[test]
fn test_backend_options_survive_roundtrip() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database_config(
        "daily",
        database_with(
            "shop",
            "mysql",
            "host = \"db.internal\"\nport = 3307\ntables = [\"orders\", \"users\"]",
        ),
    ));
    let path = ctx.write_config().unwrap();

    let loaded = load_config(&path).unwrap();
    let db = &loaded.models["daily"].databases[0];
    assert_eq!(db.option_str("host"), Some("db.internal"));
    assert_eq!(db.option_int("port"), Some(3307));
    assert_eq!(db.option_list("tables"), vec!["orders", "users"]);
}

#[test]
fn test_config_without_models_is_invalid() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("config.toml", "[global]\nwork_dir = \".\"\n[models]\n");

    let result = load_config(&config_path);
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_duplicate_database_names() {
    let ctx = TestContext::new();
    let config_content = r#"
[[models.daily.databases]]
name = "app"
type = "mysql"

[[models.daily.databases]]
name = "app"
type = "redis"
"#;
    let config_path = ctx.create_file("config.toml", config_content);

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("duplicate database name 'app'"));
}

#[test]
fn test_database_without_type() {
    let ctx = TestContext::new();
    let config_content = r#"
[[models.daily.databases]]
name = "app"
type = ""
"#;
    let config_path = ctx.create_file("config.toml", config_content);

    assert!(load_config(&config_path).is_err());
}

#[test]
fn test_ssh_host_requires_remote_port() {
    let ctx = TestContext::new();
    let config_content = r#"
[[models.daily.databases]]
name = "app"
type = "mysql"
ssh_host = "bastion"
"#;
    let config_path = ctx.create_file("config.toml", config_content);

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("tunnel_remote_port"));
}

#[test]
fn test_unknown_storage_type_rejected() {
    let ctx = TestContext::new();
    let config_content = r#"
[[models.daily.databases]]
name = "app"
type = "mysql"

[models.daily.storage]
type = "s3"
path = "bucket"
"#;
    let config_path = ctx.create_file("config.toml", config_content);

    assert!(matches!(load_config(&config_path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_unknown_on_exit_is_accepted() {
    let ctx = TestContext::new();
    let config_content = r#"
[[models.daily.databases]]
name = "app"
type = "mysql"
after_script = "notify.sh"
on_exit = "sometimes"
"#;
    let config_path = ctx.create_file("config.toml", config_content);

    let config = load_config(&config_path).unwrap();
    assert_eq!(
        config.models["daily"].databases[0].on_exit.as_deref(),
        Some("sometimes")
    );
}

#[test]
fn test_resolution_paths() {
    let builder = ConfigBuilder::minimal().add_database("weekly", "cache", "redis");
    let temp = builder.temp_dir().to_path_buf();
    let work = temp.join("weekly-work");
    let config = builder.with_model_work_dir("weekly", &work).build();

    let models = resolve_all_models(&config).unwrap();

    let daily = &models["daily"];
    assert_eq!(daily.work_dir, temp);
    assert_eq!(daily.dump_path, temp.join("tmp").join("daily"));
    assert_eq!(daily.storage.as_ref().unwrap().path, temp.join("backups"));

    let weekly = &models["weekly"];
    assert_eq!(weekly.work_dir, work);
    assert_eq!(weekly.dump_path, temp.join("tmp").join("weekly"));
}
