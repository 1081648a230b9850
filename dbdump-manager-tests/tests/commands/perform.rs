//! Tests for the 'perform' command
//!
//! Drives the backup manager end to end with recording performers, a mock
//! executor for hooks and storage, and mock tunnels.

use dbdump_manager::{BackupManager, ResolvedModel, TunnelManager};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    database_with, recording_registry, tunneled_database, ConfigBuilder, MockExecutor,
    MockTunnelBehavior, MockTunnelFactory, PerformerLog, TestContext, TunnelLog,
};
use tokio::runtime::Runtime;

struct Setup {
    runtime: Runtime,
    executor: MockExecutor,
    performers: PerformerLog,
    tunnel_log: TunnelLog,
    tunnels: MockTunnelFactory,
}

impl Setup {
    fn new(executor: MockExecutor, performers: PerformerLog, behavior: MockTunnelBehavior) -> Self {
        let tunnel_log = TunnelLog::new();
        Self {
            runtime: Runtime::new().unwrap(),
            executor,
            performers,
            tunnels: MockTunnelFactory::new(behavior, tunnel_log.clone()),
            tunnel_log,
        }
    }

    fn manager(&self) -> BackupManager {
        BackupManager::new(
            recording_registry(&["mysql", "redis", "postgresql"], &self.performers),
            Arc::new(self.executor.clone()),
            TunnelManager::new(
                self.runtime.handle().clone(),
                Arc::new(self.tunnels.clone()),
                Duration::from_millis(300),
            ),
        )
    }
}

fn model(builder: ConfigBuilder) -> (TestContext, ResolvedModel) {
    let ctx = TestContext::from_builder(builder);
    let model = ctx.model("daily").unwrap();
    (ctx, model)
}

#[test]
fn test_perform_fail_fast() {
    let setup = Setup::new(
        MockExecutor::new(),
        PerformerLog::new().fail_perform("B"),
        MockTunnelBehavior::Ready,
    );
    let (_ctx, model) = model(
        ConfigBuilder::new()
            .add_database("daily", "A", "mysql")
            .add_database("daily", "B", "mysql")
            .add_database("daily", "C", "mysql"),
    );

    let err = setup.manager().run(&model).unwrap_err();

    assert!(format!("{:#}", err).contains("B perform failed"));
    assert_eq!(
        setup.performers.calls(),
        vec!["A:init", "A:perform", "B:init", "B:perform"]
    );
}

#[test]
fn test_perform_ignores_failing_notify_hook() {
    let setup = Setup::new(
        MockExecutor::new().failing("notify.sh", "webhook down"),
        PerformerLog::new(),
        MockTunnelBehavior::Ready,
    );
    let (_ctx, model) = model(ConfigBuilder::new().add_database_config(
        "daily",
        database_with("app", "mysql", "after_script = \"-notify.sh\""),
    ));

    assert!(setup.manager().run(&model).is_ok());
    assert!(setup.executor.was_called("notify.sh"));
}

#[test]
fn test_perform_before_script_failure_skips_everything() {
    let setup = Setup::new(
        MockExecutor::new().failing("exit", "exit status 1"),
        PerformerLog::new(),
        MockTunnelBehavior::Ready,
    );
    let mut db = tunneled_database("cache", "redis", 6379, 16379);
    db.before_script = Some("exit 1".to_string());
    let (_ctx, model) = model(ConfigBuilder::new().add_database_config("daily", db));

    assert!(setup.manager().run(&model).is_err());
    assert!(setup.performers.calls().is_empty());
    assert!(setup.tunnels.created().is_empty());
}

#[test]
fn test_perform_unknown_type_opens_no_tunnel() {
    let setup = Setup::new(MockExecutor::new(), PerformerLog::new(), MockTunnelBehavior::Ready);
    let (_ctx, model) = model(
        ConfigBuilder::new()
            .add_database_config("daily", tunneled_database("events", "clickhouse", 9000, 19000))
            .add_database("daily", "app", "mysql"),
    );

    assert!(setup.manager().run(&model).is_ok());
    assert!(setup.tunnels.created().is_empty());
    assert_eq!(setup.performers.calls(), vec!["app:init", "app:perform"]);
}

#[test]
fn test_perform_tunnel_lifecycle() {
    let setup = Setup::new(MockExecutor::new(), PerformerLog::new(), MockTunnelBehavior::Ready);
    let (_ctx, model) = model(ConfigBuilder::new().add_database_config(
        "daily",
        tunneled_database("app", "postgresql", 5432, 15432),
    ));

    setup.manager().run(&model).unwrap();

    assert!(setup.tunnel_log.wait_for_shutdowns(1, Duration::from_secs(2)));
    assert_eq!(setup.tunnel_log.shutdowns(), 1);
    let created = setup.tunnels.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].remote_port, 5432);
    assert_eq!(created[0].local_port, 15432);
}

#[test]
fn test_perform_tunnel_never_ready() {
    let setup = Setup::new(
        MockExecutor::new(),
        PerformerLog::new(),
        MockTunnelBehavior::NeverReady,
    );
    let (_ctx, model) = model(ConfigBuilder::new().add_database_config(
        "daily",
        tunneled_database("app", "mysql", 3306, 13306),
    ));

    assert!(setup.manager().run(&model).is_err());
    assert_eq!(setup.performers.calls(), vec!["app:init"]);
    assert!(setup.tunnel_log.wait_for_shutdowns(1, Duration::from_secs(2)));
}

#[test]
fn test_perform_model_stores_dumps() {
    let setup = Setup::new(MockExecutor::new(), PerformerLog::new(), MockTunnelBehavior::Ready);
    let builder = ConfigBuilder::minimal();
    let backups = builder.storage_path("daily").unwrap();
    let (_ctx, model) = model(builder);

    setup.manager().perform_model(&model).unwrap();

    let call = setup.executor.last_call("cp").unwrap();
    assert_eq!(call.args[0], "-a");
    assert_eq!(call.args[1], model.dump_path.display().to_string());
    assert!(call.args[2].starts_with(&backups.display().to_string()));
}
