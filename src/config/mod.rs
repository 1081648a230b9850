//! Configuration module for dbdump-manager
//!
//! This module handles loading, validating, and resolving configuration from TOML files.
//!
//! ## Layout
//!
//! A config declares models. Each model lists database targets in the order
//! they are dumped, and optionally a storage backend for the finished dumps:
//!
//! 1. `[global]` defaults (work_dir, tmp_path, logging)
//! 2. `[models.<name>]` with `[[models.<name>.databases]]` entries
//! 3. `[models.<name>.storage]`
//!
//! ## Example Usage
//!
//! ```no_run
//! use dbdump_manager::config;
//!
//! let config = config::load_config("dbdump.toml")?;
//! let models = config::resolve_all_models(&config)?;
//!
//! for (name, model) in models {
//!     println!("Model: {}, Databases: {}", name, model.databases.len());
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    load_config, resolve_all_models, resolve_model, resolve_named_model, ConfigError, Result,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
