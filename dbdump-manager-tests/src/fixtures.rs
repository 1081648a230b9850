//! Test fixtures and sample data
//!
//! Provides pre-built database targets and a recording performer registry.

use anyhow::Result;
use dbdump_manager::config::DatabaseConfig;
use dbdump_manager::performers::{DumpContext, Performer, PerformerRegistry};
use dbdump_manager::utils::executor::CommandExecutor;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// A database target with only a name and type
pub fn database(name: &str, db_type: &str) -> DatabaseConfig {
    DatabaseConfig {
        name: name.to_string(),
        db_type: db_type.to_string(),
        ..DatabaseConfig::default()
    }
}

/// A database target parsed from extra TOML lines
pub fn database_with(name: &str, db_type: &str, extra: &str) -> DatabaseConfig {
    toml::from_str(&format!(
        "name = \"{}\"\ntype = \"{}\"\n{}",
        name, db_type, extra
    ))
    .expect("Invalid database fixture")
}

/// A database target reached through an SSH tunnel
pub fn tunneled_database(
    name: &str,
    db_type: &str,
    remote_port: u16,
    local_port: u16,
) -> DatabaseConfig {
    DatabaseConfig {
        ssh_host: Some("bastion.test".to_string()),
        tunnel_remote_port: Some(remote_port),
        tunnel_local_port: Some(local_port),
        ..database(name, db_type)
    }
}

/// Shared record of performer calls, e.g. `["app:init", "app:perform"]`
#[derive(Clone, Default)]
pub struct PerformerLog {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl PerformerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `perform` fail for the database with this name
    pub fn fail_perform(self, name: &str) -> Self {
        self.failing.lock().insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().push(call);
    }
}

struct RecordingPerformer {
    name: String,
    log: PerformerLog,
}

impl Performer for RecordingPerformer {
    fn init(&mut self) -> Result<()> {
        self.log.push(format!("{}:init", self.name));
        Ok(())
    }

    fn perform(&self) -> Result<()> {
        self.log.push(format!("{}:perform", self.name));
        if self.log.failing.lock().contains(&self.name) {
            anyhow::bail!("{} perform failed", self.name);
        }
        Ok(())
    }
}

/// Registry whose performers only record their calls
pub fn recording_registry(types: &[&str], log: &PerformerLog) -> PerformerRegistry {
    let mut registry = PerformerRegistry::new();
    for db_type in types {
        let log = log.clone();
        registry.register(
            db_type,
            move |ctx: DumpContext, _: Arc<dyn CommandExecutor>| -> Box<dyn Performer> {
                Box::new(RecordingPerformer {
                    name: ctx.name,
                    log: log.clone(),
                })
            },
        );
    }
    registry
}
