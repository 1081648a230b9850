//! Unit tests for the performer registry and bundled performers

use dbdump_manager::performers::{DumpContext, PerformerRegistry};
use std::sync::Arc;
use test_utils::{database_with, tunneled_database, ConfigBuilder, MockExecutor, TestContext};

fn context(ctx: &TestContext, model: &str, db_name: &str) -> DumpContext {
    let model = ctx.model(model).unwrap();
    let db = model
        .databases
        .iter()
        .find(|d| d.name == db_name)
        .unwrap()
        .clone();
    DumpContext::new(&model, &db)
}

#[test]
fn test_dump_path_layout() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dump = context(&ctx, "daily", "app");

    assert_eq!(dump.dump_path, ctx.temp_dir().join("tmp/daily/mysql/app"));
    assert!(dump.dump_path.is_dir());
}

#[test]
fn test_builtin_mysql_through_tunnel() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database_config(
        "daily",
        tunneled_database("shop", "mysql", 3306, 13306),
    ));
    let executor = MockExecutor::new();
    let registry = PerformerRegistry::with_builtin();

    let mut performer = registry
        .build(context(&ctx, "daily", "shop"), Arc::new(executor.clone()))
        .unwrap();
    performer.init().unwrap();
    performer.perform().unwrap();

    let call = executor.last_call("mysqldump").unwrap();
    assert!(call.has_arg("--host=127.0.0.1"));
    assert!(call.has_arg("--port=13306"));
}

#[test]
fn test_missing_binary_fails_init() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database_config(
        "daily",
        database_with("events", "mongodb", "database = \"events\""),
    ));
    let executor = MockExecutor::new().without_program("mongodump");
    let registry = PerformerRegistry::with_builtin();

    let mut performer = registry
        .build(context(&ctx, "daily", "events"), Arc::new(executor.clone()))
        .unwrap();
    let err = performer.init().unwrap_err();
    assert!(err.to_string().contains("mongodump"));
    assert!(executor.get_calls().is_empty());
}

#[test]
fn test_unregistered_type() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_database("daily", "events", "clickhouse"),
    );
    let registry = PerformerRegistry::with_builtin();

    assert!(!registry.contains("clickhouse"));
    assert!(registry
        .build(context(&ctx, "daily", "events"), Arc::new(MockExecutor::new()))
        .is_none());
}
