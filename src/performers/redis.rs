//! Redis dumps, either streamed with `redis-cli --rdb` or copied from disk
//!
//! `mode = "sync"` (default) asks the server for an RDB snapshot over the
//! network. `mode = "copy"` copies `rdb_path` from the local filesystem,
//! optionally after `invoke_save`.

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sync,
    Copy,
}

pub struct Redis {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    mode: Mode,
    host: String,
    port: u16,
    socket: Option<String>,
    password: Option<String>,
    rdb_path: Option<PathBuf>,
    invoke_save: bool,
    args: Vec<String>,
}

impl Redis {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            mode: Mode::Sync,
            host: String::new(),
            port: 6379,
            socket: None,
            password: None,
            rdb_path: None,
            invoke_save: false,
            args: Vec::new(),
        }
    }

    fn cli(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("redis-cli");

        match self.socket {
            Some(ref socket) if self.ctx.tunnel.is_none() => {
                cmd = cmd.arg("-s").arg(socket);
            }
            _ => {
                cmd = cmd
                    .arg("-h")
                    .arg(&self.host)
                    .arg("-p")
                    .arg(self.port.to_string());
            }
        }

        if let Some(ref password) = self.password {
            cmd = cmd.env("REDISCLI_AUTH", password);
        }

        cmd.args(self.args.iter().cloned())
    }

    fn dump_file(&self) -> PathBuf {
        self.ctx.dump_file("dump.rdb")
    }

    fn save(&self) -> Result<()> {
        info!("Perform redis-cli save...");
        self.executor
            .run(&self.cli().arg("SAVE"))
            .context("redis-cli SAVE failed")?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        info!("Syncing redis dump to {:?}", self.dump_file());
        self.executor
            .run(&self.cli().arg("--rdb").arg(self.dump_file().display().to_string()))
            .context("redis-cli --rdb failed")?;
        Ok(())
    }

    fn copy(&self) -> Result<()> {
        let rdb_path = self
            .rdb_path
            .as_ref()
            .context("redis copy mode requires rdb_path")?;

        info!("Copying redis dump from {:?}", rdb_path);
        let cmd = CommandSpec::new("cp")
            .arg(rdb_path.display().to_string())
            .arg(self.dump_file().display().to_string());
        self.executor.run(&cmd).context("Failed to copy redis dump")?;
        Ok(())
    }
}

impl Performer for Redis {
    fn init(&mut self) -> Result<()> {
        self.mode = match self.ctx.option_or("mode", "sync").as_str() {
            "sync" => Mode::Sync,
            "copy" => Mode::Copy,
            other => anyhow::bail!("{}: unknown redis mode '{}'", self.ctx.name, other),
        };
        self.host = self.ctx.host("127.0.0.1");
        self.port = self.ctx.port(6379)?;
        self.socket = self.ctx.option("socket");
        self.password = self.ctx.option("password");
        self.rdb_path = self.ctx.option("rdb_path").map(|p| self.ctx.resolve_path(&p));
        self.invoke_save = self.ctx.option_bool("invoke_save");
        self.args = self.ctx.extra_args()?;

        match self.mode {
            Mode::Sync => require_program(self.executor.as_ref(), "redis-cli"),
            Mode::Copy => {
                let rdb_path = self
                    .rdb_path
                    .as_ref()
                    .with_context(|| {
                        format!("{}: redis copy mode requires rdb_path", self.ctx.name)
                    })?;
                if !rdb_path.exists() {
                    anyhow::bail!("Redis rdb file {:?} does not exist", rdb_path);
                }
                if self.invoke_save {
                    require_program(self.executor.as_ref(), "redis-cli")?;
                }
                Ok(())
            }
        }
    }

    fn perform(&self) -> Result<()> {
        if self.invoke_save {
            self.save()?;
        }

        match self.mode {
            Mode::Sync => self.sync(),
            Mode::Copy => self.copy(),
        }
    }
}
