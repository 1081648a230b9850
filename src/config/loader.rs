use super::expand_tilde;
use super::types::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Model '{0}' not found")]
    ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.models.is_empty() {
        return Err(ConfigError::ValidationError("No models defined".to_string()));
    }

    for (name, model) in &config.models {
        validate_model(name, model)?;
    }

    Ok(())
}

fn validate_model(name: &str, model: &ModelConfig) -> Result<()> {
    let mut seen = HashSet::new();

    for db in &model.databases {
        if db.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Model '{}': database entry without a name",
                name
            )));
        }

        if db.db_type.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Model '{}': database '{}' has no type",
                name, db.name
            )));
        }

        if !seen.insert(db.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Model '{}': duplicate database name '{}'",
                name, db.name
            )));
        }

        if db.uses_tunnel() && db.tunnel_remote_port.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Model '{}': database '{}' sets ssh_host but no tunnel_remote_port",
                name, db.name
            )));
        }
    }

    if let Some(ref storage) = model.storage {
        if storage.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Model '{}': storage path is empty",
                name
            )));
        }
    }

    Ok(())
}

/// Resolve a model by applying global defaults and making paths absolute
pub fn resolve_model(name: &str, model: &ModelConfig, config: &Config) -> Result<ResolvedModel> {
    let global_work_dir = expand_tilde(&config.global.work_dir);

    // Resolve work_dir (model > global)
    let work_dir = match model.work_dir {
        Some(ref dir) => join_relative(&global_work_dir, &expand_tilde(dir)),
        None => global_work_dir.clone(),
    };

    let tmp_path = join_relative(&global_work_dir, &expand_tilde(&config.global.tmp_path));
    let dump_path = tmp_path.join(name);

    let storage = model.storage.clone().map(|mut s| {
        s.path = join_relative(&work_dir, &expand_tilde(&s.path));
        s
    });

    Ok(ResolvedModel {
        name: name.to_string(),
        description: model.description.clone(),
        work_dir,
        dump_path,
        databases: model.databases.clone(),
        storage,
    })
}

/// Resolve a single model by name
pub fn resolve_named_model(name: &str, config: &Config) -> Result<ResolvedModel> {
    let model = config
        .models
        .get(name)
        .ok_or_else(|| ConfigError::ModelNotFound(name.to_string()))?;
    resolve_model(name, model, config)
}

/// Resolve all models in the configuration
pub fn resolve_all_models(config: &Config) -> Result<BTreeMap<String, ResolvedModel>> {
    let mut resolved = BTreeMap::new();

    for (name, model) in &config.models {
        resolved.insert(name.clone(), resolve_model(name, model, config)?);
    }

    Ok(resolved)
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
