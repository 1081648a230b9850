//! Tests for the 'list' command
//!
//! The list command displays all configured models and their databases.

use dbdump_manager::config::resolve_all_models;
use test_utils::{tunneled_database, ConfigBuilder};

#[test]
fn test_list_all_models() {
    let config = ConfigBuilder::minimal()
        .add_database("hourly", "cache", "redis")
        .add_database("weekly", "warehouse", "postgresql")
        .build();

    let resolved = resolve_all_models(&config).unwrap();

    // BTreeMap keeps models sorted by name
    let names: Vec<_> = resolved.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["daily", "hourly", "weekly"]);
}

#[test]
fn test_list_shows_databases_in_order() {
    let config = ConfigBuilder::new()
        .add_database("daily", "z-last-name", "mysql")
        .add_database("daily", "a-first-name", "redis")
        .build();

    let resolved = resolve_all_models(&config).unwrap();
    let dbs: Vec<_> = resolved["daily"]
        .databases
        .iter()
        .map(|d| (d.name.as_str(), d.db_type.as_str()))
        .collect();

    assert_eq!(dbs, vec![("z-last-name", "mysql"), ("a-first-name", "redis")]);
}

#[test]
fn test_list_shows_tunnel_host() {
    let config = ConfigBuilder::new()
        .add_database_config("daily", tunneled_database("app", "mysql", 3306, 13306))
        .build();

    let resolved = resolve_all_models(&config).unwrap();
    let db = &resolved["daily"].databases[0];

    assert!(db.uses_tunnel());
    assert_eq!(db.ssh_host.as_deref(), Some("bastion.test"));
}

#[test]
fn test_list_shows_storage() {
    let builder = ConfigBuilder::minimal();
    let expected = builder.storage_path("daily").unwrap();
    let config = builder.add_database("nostore", "app", "mysql").build();

    let resolved = resolve_all_models(&config).unwrap();
    assert_eq!(resolved["daily"].storage.as_ref().unwrap().path, expected);
    assert!(resolved["nostore"].storage.is_none());
}
