//! Database performers and the registry that dispatches to them
//!
//! A performer knows how to dump one kind of database. The registry maps the
//! `type` tag of a database target to a factory; unknown tags yield `None`
//! so the caller can skip the target.

pub mod context;
pub mod influxdb2;
pub mod mongodb;
pub mod mssql;
pub mod mysql;
pub mod postgresql;
pub mod redis;
pub mod sqlite;

pub use context::DumpContext;

use crate::utils::executor::CommandExecutor;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Two-phase dump contract
pub trait Performer: Send {
    /// Validate configuration and prepare the dump location
    fn init(&mut self) -> Result<()>;

    /// Produce the dump under the context's dump path
    fn perform(&self) -> Result<()>;
}

/// Builds a performer for one target
pub type PerformerFactory =
    Box<dyn Fn(DumpContext, Arc<dyn CommandExecutor>) -> Box<dyn Performer> + Send + Sync>;

/// Maps type tags to performer factories
pub struct PerformerRegistry {
    factories: HashMap<String, PerformerFactory>,
}

impl PerformerRegistry {
    /// Registry with no performers
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with all bundled performers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("mysql", |ctx, exec| Box::new(mysql::MySql::new(ctx, exec)));
        registry.register("redis", |ctx, exec| Box::new(redis::Redis::new(ctx, exec)));
        registry.register("postgresql", |ctx, exec| {
            Box::new(postgresql::PostgreSql::new(ctx, exec))
        });
        registry.register("mongodb", |ctx, exec| Box::new(mongodb::MongoDb::new(ctx, exec)));
        registry.register("sqlite", |ctx, exec| Box::new(sqlite::Sqlite::new(ctx, exec)));
        registry.register("mssql", |ctx, exec| Box::new(mssql::MsSql::new(ctx, exec)));
        registry.register("influxdb2", |ctx, exec| {
            Box::new(influxdb2::InfluxDb2::new(ctx, exec))
        });
        registry
    }

    /// Register (or replace) the factory for a type tag
    pub fn register<F>(&mut self, db_type: &str, factory: F)
    where
        F: Fn(DumpContext, Arc<dyn CommandExecutor>) -> Box<dyn Performer> + Send + Sync + 'static,
    {
        self.factories.insert(db_type.to_string(), Box::new(factory));
    }

    pub fn contains(&self, db_type: &str) -> bool {
        self.factories.contains_key(db_type)
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Build the performer for a context, or `None` for an unknown type
    pub fn build(
        &self,
        ctx: DumpContext,
        executor: Arc<dyn CommandExecutor>,
    ) -> Option<Box<dyn Performer>> {
        self.factories
            .get(&ctx.db_type)
            .map(|factory| factory(ctx, executor))
    }
}

impl Default for PerformerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Fail unless `program` is installed
pub(crate) fn require_program(executor: &dyn CommandExecutor, program: &str) -> Result<()> {
    if !executor.program_exists(program) {
        anyhow::bail!("{} is not installed or not in PATH", program);
    }
    Ok(())
}
