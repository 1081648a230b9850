//! Storage backends for finished dumps
//!
//! After every database of a model has been dumped, the model's dump
//! directory is uploaded to its storage under a timestamp key and older
//! uploads beyond `keep` are removed.

pub mod local;

use crate::config::{ResolvedModel, StorageConfig, StorageType};
use crate::utils::executor::CommandExecutor;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span, warn};

/// Format of the key an upload is stored under
pub const KEY_FORMAT: &str = "%Y.%m.%d.%H.%M.%S";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} failed: {source}")]
    Command {
        action: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage key '{0}' already exists")]
    KeyExists(String),

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("{0} is not supported by this storage")]
    Unsupported(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// One stored upload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileItem {
    pub filename: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Storage contract
pub trait Storage {
    /// Prepare the backend (create directories, check tools)
    fn open(&mut self) -> Result<()>;

    /// Store the archive under `file_key`
    fn upload(&self, file_key: &str) -> Result<()>;

    fn delete(&self, file_key: &str) -> Result<()>;

    /// Items directly under `parent` (`""` for the root)
    fn list(&self, parent: &str) -> Result<Vec<FileItem>>;

    /// Fetch a stored item to a local path
    fn download(&self, file_key: &str) -> Result<PathBuf>;
}

/// Build the backend for a storage config
///
/// `archive_path` is what `upload` copies.
pub fn new_storage(
    model: &str,
    config: &StorageConfig,
    archive_path: &Path,
    executor: Arc<dyn CommandExecutor>,
) -> Box<dyn Storage> {
    match config.storage_type {
        StorageType::Local => Box::new(local::LocalStorage::new(
            model,
            config.clone(),
            archive_path,
            executor,
        )),
    }
}

/// Key for an upload made now
pub fn timestamp_key() -> String {
    Local::now().format(KEY_FORMAT).to_string()
}

/// Upload the model's dump directory and apply the retention limit
///
/// Returns the key the dump was stored under, or `None` when the model has
/// no storage. The dump directory is removed afterwards on a best-effort
/// basis.
pub fn run(model: &ResolvedModel, executor: Arc<dyn CommandExecutor>) -> Result<Option<String>> {
    let Some(ref config) = model.storage else {
        info!("Model '{}' has no storage, keeping dumps in {:?}", model.name, model.dump_path);
        return Ok(None);
    };

    let span = info_span!("storage", model = %model.name);
    let _enter = span.enter();

    let mut storage = new_storage(&model.name, config, &model.dump_path, executor);
    let key = timestamp_key();

    storage.open()?;
    info!("Uploading dump to {:?} as {}/{}", config.path, model.name, key);
    storage.upload(&key)?;
    info!("Upload succeeded");

    cycle(storage.as_ref(), config.keep)?;

    if let Err(e) = fs::remove_dir_all(&model.dump_path) {
        warn!("Failed to remove dump path {:?}: {}", model.dump_path, e);
    }

    Ok(Some(key))
}

/// Whether a stored item name is an upload key
pub fn is_upload_key(name: &str) -> bool {
    NaiveDateTime::parse_from_str(name, KEY_FORMAT).is_ok()
}

/// Delete the oldest uploads so that at most `keep` remain; 0 keeps everything
///
/// Items whose name is not an upload key are never counted or deleted.
pub fn cycle(storage: &dyn Storage, keep: usize) -> Result<Vec<String>> {
    if keep == 0 {
        return Ok(Vec::new());
    }

    let mut items: Vec<FileItem> = storage
        .list("")?
        .into_iter()
        .filter(|item| is_upload_key(&item.filename))
        .collect();
    if items.len() <= keep {
        return Ok(Vec::new());
    }

    items.sort_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    let excess = items.len() - keep;
    let mut removed = Vec::with_capacity(excess);
    for item in items.into_iter().take(excess) {
        info!("Removing old dump {}", item.filename);
        storage.delete(&item.filename)?;
        removed.push(item.filename);
    }

    Ok(removed)
}
