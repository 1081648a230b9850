//! Unit tests for local storage and retention

use dbdump_manager::storage::{self, new_storage, StorageError};
use std::fs;
use std::sync::Arc;
use test_utils::{ConfigBuilder, MockExecutor, TestContext};

#[test]
fn test_cycle_keeps_newest_uploads() {
    let builder = ConfigBuilder::minimal();
    let backups = builder.storage_path("daily").unwrap().join("daily");
    let ctx = TestContext::from_builder(builder);
    let model = ctx.model("daily").unwrap();

    for key in ["2024.01.01.00.00.00", "2024.01.02.00.00.00", "2024.01.03.00.00.00"] {
        fs::create_dir_all(backups.join(key)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    let backend = new_storage(
        &model.name,
        model.storage.as_ref().unwrap(),
        &model.dump_path,
        Arc::new(MockExecutor::new()),
    );
    let removed = storage::cycle(backend.as_ref(), 2).unwrap();

    assert_eq!(removed, vec!["2024.01.01.00.00.00"]);
    let remaining: Vec<_> = backend
        .list("")
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(remaining, vec!["2024.01.02.00.00.00", "2024.01.03.00.00.00"]);
}

#[test]
fn test_run_uploads_and_removes_dump_dir() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let model = ctx.model("daily").unwrap();
    fs::create_dir_all(model.dump_path.join("mysql/app")).unwrap();
    let executor = MockExecutor::new();

    let key = storage::run(&model, Arc::new(executor.clone())).unwrap().unwrap();

    let call = executor.last_call("cp").unwrap();
    let target = model.storage.as_ref().unwrap().path.join("daily").join(&key);
    assert_eq!(call.args[2], target.display().to_string());
    assert!(!model.dump_path.exists());
}

#[test]
fn test_models_sharing_a_path_keep_their_own_uploads() {
    let builder = ConfigBuilder::minimal();
    let shared = builder.storage_path("daily").unwrap();
    let ctx = TestContext::from_builder(
        builder
            .add_database("weekly", "app", "mysql")
            .with_local_storage("weekly", &shared, 1),
    );

    for key in ["2024.01.01.00.00.00", "2024.01.02.00.00.00"] {
        fs::create_dir_all(shared.join("daily").join(key)).unwrap();
        fs::create_dir_all(shared.join("weekly").join(key)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    fs::write(shared.join("weekly/notes.txt"), "keep me").unwrap();

    let weekly = ctx.model("weekly").unwrap();
    let backend = new_storage(
        &weekly.name,
        weekly.storage.as_ref().unwrap(),
        &weekly.dump_path,
        Arc::new(MockExecutor::new()),
    );
    let removed = storage::cycle(backend.as_ref(), 1).unwrap();

    assert_eq!(removed, vec!["2024.01.01.00.00.00"]);
    assert!(shared.join("weekly/notes.txt").exists());
    assert!(shared.join("daily/2024.01.01.00.00.00").is_dir());
    assert!(shared.join("daily/2024.01.02.00.00.00").is_dir());
}

#[test]
fn test_upload_refuses_existing_key() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let model = ctx.model("daily").unwrap();
    fs::create_dir_all(&model.dump_path).unwrap();
    let executor = MockExecutor::new();

    let backend = new_storage(
        &model.name,
        model.storage.as_ref().unwrap(),
        &model.dump_path,
        Arc::new(executor.clone()),
    );
    let key = storage::timestamp_key();
    fs::create_dir_all(model.storage.as_ref().unwrap().path.join("daily").join(&key)).unwrap();

    assert!(matches!(backend.upload(&key), Err(StorageError::KeyExists(_))));
    assert!(!executor.was_called("cp"));
}

#[test]
fn test_run_without_storage_keeps_dumps() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_database("daily", "app", "mysql"));
    let model = ctx.model("daily").unwrap();
    fs::create_dir_all(&model.dump_path).unwrap();
    let executor = MockExecutor::new();

    assert!(storage::run(&model, Arc::new(executor.clone())).unwrap().is_none());
    assert!(executor.get_calls().is_empty());
    assert!(model.dump_path.exists());
}

#[test]
fn test_download_is_unsupported() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let model = ctx.model("daily").unwrap();
    let backend = new_storage(
        &model.name,
        model.storage.as_ref().unwrap(),
        &model.dump_path,
        Arc::new(MockExecutor::new()),
    );

    assert!(matches!(backend.download("x"), Err(StorageError::Unsupported(_))));
}
