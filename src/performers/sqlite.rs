//! SQLite dumps via the `sqlite3` online backup command

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct Sqlite {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    path: PathBuf,
}

impl Sqlite {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            path: PathBuf::new(),
        }
    }
}

impl Performer for Sqlite {
    fn init(&mut self) -> Result<()> {
        let path = self
            .ctx
            .option("path")
            .with_context(|| format!("{}: sqlite requires path", self.ctx.name))?;
        self.path = self.ctx.resolve_path(&path);

        if !self.path.is_file() {
            anyhow::bail!("SQLite database {:?} does not exist", self.path);
        }

        require_program(self.executor.as_ref(), "sqlite3")
    }

    fn perform(&self) -> Result<()> {
        let target = self.ctx.dump_file(&format!("{}.sqlite", self.ctx.name));
        info!("-> Dumping SQLite {:?}...", self.path);

        let cmd = CommandSpec::new("sqlite3")
            .arg(self.path.display().to_string())
            .arg(format!(".backup '{}'", target.display()));
        self.executor
            .run(&cmd)
            .with_context(|| format!("sqlite3 backup of {:?} failed", self.path))?;

        info!("dump path: {:?}", target);
        Ok(())
    }
}
