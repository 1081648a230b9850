//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use crate::fixtures::database;
use dbdump_manager::config::{
    Config, DatabaseConfig, GlobalConfig, ModelConfig, StorageConfig, StorageType,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    models: BTreeMap<String, ModelConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with paths inside a fresh temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            work_dir: temp_dir.path().to_path_buf(),
            tmp_path: temp_dir.path().join("tmp"),
            tunnel_ready_timeout_seconds: 1,
            log_directory,
            log_level: "info".to_string(),
            log_max_files: 5,
            log_max_size_mb: 10,
        };

        Self {
            temp_dir,
            global,
            models: BTreeMap::new(),
        }
    }

    /// Create a minimal config: model `daily` with one mysql database and local storage
    pub fn minimal() -> Self {
        let builder = Self::new();
        let backup_path = builder.temp_dir.path().join("backups");
        builder
            .add_database("daily", "app", "mysql")
            .with_local_storage("daily", &backup_path, 0)
    }

    /// Set the log directory
    pub fn with_log_dir(mut self, path: &Path) -> Self {
        self.global.log_directory = path.to_path_buf();
        self
    }

    /// Set the tunnel ready timeout
    pub fn with_tunnel_timeout(mut self, seconds: u64) -> Self {
        self.global.tunnel_ready_timeout_seconds = seconds;
        self
    }

    /// Add an empty model
    pub fn add_model(mut self, name: &str) -> Self {
        self.models.entry(name.to_string()).or_insert_with(|| ModelConfig {
            description: format!("Test model: {}", name),
            ..ModelConfig::default()
        });
        self
    }

    /// Add a database with just a name and type, creating the model if needed
    pub fn add_database(self, model: &str, name: &str, db_type: &str) -> Self {
        self.add_database_config(model, database(name, db_type))
    }

    /// Add a database with full configuration
    pub fn add_database_config(mut self, model: &str, db: DatabaseConfig) -> Self {
        self = self.add_model(model);
        if let Some(m) = self.models.get_mut(model) {
            m.databases.push(db);
        }
        self
    }

    /// Attach local storage to a model
    pub fn with_local_storage(mut self, model: &str, path: &Path, keep: usize) -> Self {
        self = self.add_model(model);
        if let Some(m) = self.models.get_mut(model) {
            m.storage = Some(StorageConfig {
                storage_type: StorageType::Local,
                path: path.to_path_buf(),
                keep,
                google_drive_sync: false,
                google_drive_rclone_remote_name: None,
            });
        }
        self
    }

    /// Override a model's working directory
    pub fn with_model_work_dir(mut self, model: &str, work_dir: &Path) -> Self {
        self = self.add_model(model);
        if let Some(m) = self.models.get_mut(model) {
            m.work_dir = Some(work_dir.to_path_buf());
        }
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get a model's storage path
    pub fn storage_path(&self, model: &str) -> Option<PathBuf> {
        self.models
            .get(model)
            .and_then(|m| m.storage.as_ref())
            .map(|s| s.path.clone())
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            models: self.models,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
