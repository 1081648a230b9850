use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub models: BTreeMap<String, ModelConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Base directory for relative paths
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Root for per-model dump output
    #[serde(default = "default_tmp_path")]
    pub tmp_path: PathBuf,

    /// How long to wait for an SSH tunnel to become ready
    #[serde(default = "default_tunnel_ready_timeout")]
    pub tunnel_ready_timeout_seconds: u64,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
    /// Not enforced; log files rotate daily regardless of size
    #[serde(default = "default_log_max_size_mb")]
    pub log_max_size_mb: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            tmp_path: default_tmp_path(),
            tunnel_ready_timeout_seconds: default_tunnel_ready_timeout(),
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
            log_max_size_mb: default_log_max_size_mb(),
        }
    }
}

/// A named backup job (raw, before resolution)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ModelConfig {
    #[serde(default)]
    pub description: String,

    /// Working directory override (hooks run here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Databases to dump, in declaration order
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,

    /// Where the dumps end up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

/// One database target inside a model
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    pub name: String,

    /// Backend type tag, e.g. "mysql"
    #[serde(rename = "type")]
    pub db_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_script: Option<String>,
    /// When the after_script runs if the dump failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_exit: Option<String>,

    /// SSH tunnel settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_db_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_remote_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_local_port: Option<u16>,

    /// Backend-specific keys (host, port, database, ...)
    #[serde(flatten)]
    pub options: toml::Table,
}

impl DatabaseConfig {
    /// Look up a string option
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Look up an integer option
    pub fn option_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    /// Look up a boolean option
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    /// Look up a list of strings, accepting a single string as well
    pub fn option_list(&self, key: &str) -> Vec<String> {
        match self.options.get(key) {
            Some(toml::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(toml::Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this target needs an SSH tunnel
    pub fn uses_tunnel(&self) -> bool {
        self.ssh_host.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Target directory (local)
    pub path: PathBuf,

    /// Number of stored dumps to keep (0 keeps everything)
    #[serde(default)]
    pub keep: usize,

    /// Mirror the target directory with rclone after upload
    #[serde(default)]
    pub google_drive_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_drive_rclone_remote_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
}

/// Resolved model (paths made absolute, defaults applied)
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub name: String,
    pub description: String,
    pub work_dir: PathBuf,
    pub dump_path: PathBuf,
    pub databases: Vec<DatabaseConfig>,
    pub storage: Option<StorageConfig>,
}

// Default value functions

fn default_work_dir() -> PathBuf { PathBuf::from(".") }
fn default_tmp_path() -> PathBuf { std::env::temp_dir().join("dbdump-manager") }
fn default_tunnel_ready_timeout() -> u64 { 30 }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_log_max_size_mb() -> u64 { 10 }
