//! Per-target runtime state shared by all performers

use crate::config::{DatabaseConfig, ResolvedModel};
use crate::managers::tunnel::TunnelSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// Runtime state for dumping one target
#[derive(Debug, Clone)]
pub struct DumpContext {
    pub model: String,
    pub name: String,
    pub db_type: String,
    /// `<model dump_path>/<type>/<name>`
    pub dump_path: PathBuf,
    pub work_dir: PathBuf,
    pub config: DatabaseConfig,
    pub tunnel: Option<TunnelSettings>,
}

impl DumpContext {
    /// Build the context and create the dump directory
    ///
    /// A directory that cannot be created is logged, not returned; the
    /// performer fails against it later.
    pub fn new(model: &ResolvedModel, db: &DatabaseConfig) -> Self {
        let dump_path = model.dump_path.join(&db.db_type).join(&db.name);

        if let Err(e) = fs::create_dir_all(&dump_path) {
            error!("Failed to mkdir dump path {:?}: {}", dump_path, e);
        }

        Self {
            model: model.name.clone(),
            name: db.name.clone(),
            db_type: db.db_type.clone(),
            dump_path,
            work_dir: model.work_dir.clone(),
            config: db.clone(),
            tunnel: TunnelSettings::from_config(db),
        }
    }

    /// String option with a default
    pub fn option_or(&self, key: &str, default: &str) -> String {
        self.config
            .option_str(key)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Non-empty string option
    pub fn option(&self, key: &str) -> Option<String> {
        self.config
            .option_str(key)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn option_list(&self, key: &str) -> Vec<String> {
        self.config.option_list(key)
    }

    pub fn option_bool(&self, key: &str) -> bool {
        self.config.option_bool(key).unwrap_or(false)
    }

    /// Database name, defaulting to the target name
    pub fn database(&self) -> String {
        self.option_or("database", &self.name)
    }

    /// Host to connect to; the tunnel's local end when one is configured
    pub fn host(&self, default: &str) -> String {
        match self.tunnel {
            Some(_) => "127.0.0.1".to_string(),
            None => self.option_or("host", default),
        }
    }

    /// Port to connect to; the tunnel's local port when one is configured
    pub fn port(&self, default: u16) -> Result<u16> {
        if let Some(ref tunnel) = self.tunnel {
            return Ok(tunnel.local_port);
        }

        match self.config.options.get("port") {
            None => Ok(default),
            Some(toml::Value::Integer(p)) => u16::try_from(*p)
                .with_context(|| format!("{}: port {} out of range", self.name, p)),
            Some(toml::Value::String(s)) => s
                .parse()
                .with_context(|| format!("{}: invalid port '{}'", self.name, s)),
            Some(other) => anyhow::bail!("{}: invalid port {}", self.name, other),
        }
    }

    /// Extra command-line arguments from the `args` option
    pub fn extra_args(&self) -> Result<Vec<String>> {
        match self.option("args") {
            None => Ok(Vec::new()),
            Some(args) => shlex::split(&args)
                .with_context(|| format!("{}: cannot parse args `{}`", self.name, args)),
        }
    }

    /// Resolve a path option against the model's working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = crate::config::expand_tilde(Path::new(path));
        if path.is_absolute() {
            path
        } else {
            self.work_dir.join(path)
        }
    }

    /// File inside the dump directory
    pub fn dump_file(&self, file_name: &str) -> PathBuf {
        self.dump_path.join(file_name)
    }
}
