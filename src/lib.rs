//! dbdump-manager library
//!
//! Orchestrates database dumps: hooks, SSH tunnels, per-engine performers
//! and storage of the finished dumps.

pub mod config;
pub mod managers;
pub mod performers;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_all_models, resolve_named_model, Config, ResolvedModel};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::tunnel::TunnelManager;
pub use performers::PerformerRegistry;
