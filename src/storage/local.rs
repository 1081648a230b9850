//! Local filesystem storage with optional rclone mirroring
//!
//! Uploads of a model live under `<path>/<model>/<key>`, so models can share
//! one storage path without touching each other's dumps.

use super::{FileItem, Result, Storage, StorageError};
use crate::config::StorageConfig;
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct LocalStorage {
    model: String,
    root: PathBuf,
    config: StorageConfig,
    archive_path: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl LocalStorage {
    pub fn new(
        model: &str,
        config: StorageConfig,
        archive_path: &Path,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            model: model.to_string(),
            root: config.path.join(model),
            config,
            archive_path: archive_path.to_path_buf(),
            executor,
        }
    }

    /// Directory holding this model's uploads
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a key inside the model's storage directory
    fn key_path(&self, file_key: &str) -> Result<PathBuf> {
        let key = Path::new(file_key);
        let valid = key
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(StorageError::InvalidKey(file_key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn remote_name(&self) -> Option<&str> {
        self.config
            .google_drive_rclone_remote_name
            .as_deref()
            .filter(|r| !r.is_empty())
    }

    fn sync(&self) -> Result<()> {
        let Some(remote) = self.remote_name() else {
            return Ok(());
        };

        let target = format!("{}:{}", remote, self.model);
        info!("Syncing {:?} to {}", self.root, target);

        let cmd = CommandSpec::new("rclone")
            .arg("sync")
            .arg(self.root.display().to_string())
            .arg(target);
        self.executor
            .run(&cmd)
            .map_err(|source| StorageError::Command {
                action: "rclone sync".to_string(),
                source,
            })?;
        Ok(())
    }
}

impl Storage for LocalStorage {
    fn open(&mut self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        if self.config.google_drive_sync {
            if self.remote_name().is_none() {
                return Err(StorageError::Config(
                    "google_drive_sync requires google_drive_rclone_remote_name".to_string(),
                ));
            }
            if !self.executor.program_exists("rclone") {
                return Err(StorageError::Config(
                    "rclone is not installed or not in PATH".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn upload(&self, file_key: &str) -> Result<()> {
        let target = self.key_path(file_key)?;
        // cp would nest the dump inside an existing upload
        if target.exists() {
            return Err(StorageError::KeyExists(file_key.to_string()));
        }

        let cmd = CommandSpec::new("cp")
            .arg("-a")
            .arg(self.archive_path.display().to_string())
            .arg(target.display().to_string());
        self.executor
            .run(&cmd)
            .map_err(|source| StorageError::Command {
                action: "cp".to_string(),
                source,
            })?;
        info!("Store succeeded {:?}", target);

        if self.config.google_drive_sync {
            self.sync()?;
        }
        Ok(())
    }

    fn delete(&self, file_key: &str) -> Result<()> {
        let path = self.key_path(file_key)?;
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| StorageError::io(&path, e))?;
        debug!("Deleted {:?}", path);
        Ok(())
    }

    fn list(&self, parent: &str) -> Result<Vec<FileItem>> {
        let dir = self.key_path(parent)?;
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| StorageError::io(&path, e))?;

            let modified = metadata.modified().map_err(|e| StorageError::io(&path, e))?;
            let size = if metadata.is_dir() {
                dir_size(&path)?
            } else {
                metadata.len()
            };

            items.push(FileItem {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size,
                last_modified: DateTime::<Utc>::from(modified),
            });
        }

        items.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(items)
    }

    fn download(&self, _file_key: &str) -> Result<PathBuf> {
        Err(StorageError::Unsupported("download from local storage".to_string()))
    }
}

fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path).map_err(|e| StorageError::io(path, e))? {
        let entry = entry.map_err(|e| StorageError::io(path, e))?;
        let metadata = entry.metadata().map_err(|e| StorageError::io(entry.path(), e))?;
        total += if metadata.is_dir() {
            dir_size(&entry.path())?
        } else {
            metadata.len()
        };
    }
    Ok(total)
}
