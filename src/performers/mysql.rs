//! MySQL / MariaDB dumps via `mysqldump`
//!
//! ```toml
//! [[models.daily.databases]]
//! name = "app"
//! type = "mysql"
//! host = "127.0.0.1"
//! port = 3306
//! username = "root"
//! password = "secret"
//! database = "app"
//! tables = ["users"]
//! exclude_tables = ["sessions"]
//! args = "--single-transaction"
//! ```

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct MySql {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    host: String,
    port: u16,
    socket: Option<String>,
    username: String,
    password: Option<String>,
    database: String,
    tables: Vec<String>,
    exclude_tables: Vec<String>,
    args: Vec<String>,
}

impl MySql {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            host: String::new(),
            port: 3306,
            socket: None,
            username: String::new(),
            password: None,
            database: String::new(),
            tables: Vec::new(),
            exclude_tables: Vec::new(),
            args: Vec::new(),
        }
    }

    fn dump_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("mysqldump");

        // A socket only makes sense without a tunnel
        match self.socket {
            Some(ref socket) if self.ctx.tunnel.is_none() => {
                cmd = cmd.arg(format!("--socket={}", socket));
            }
            _ => {
                cmd = cmd
                    .arg(format!("--host={}", self.host))
                    .arg(format!("--port={}", self.port));
            }
        }

        cmd = cmd.arg(format!("--user={}", self.username));
        if let Some(ref password) = self.password {
            cmd = cmd.env("MYSQL_PWD", password);
        }

        cmd = cmd.args(self.args.iter().cloned()).arg(&self.database);
        cmd = cmd.args(self.tables.iter().cloned());
        for table in &self.exclude_tables {
            cmd = cmd.arg(format!("--ignore-table={}.{}", self.database, table));
        }

        let dump_file = self.ctx.dump_file(&format!("{}.sql", self.database));
        cmd.arg(format!("--result-file={}", dump_file.display()))
    }
}

impl Performer for MySql {
    fn init(&mut self) -> Result<()> {
        self.host = self.ctx.host("127.0.0.1");
        self.port = self.ctx.port(3306)?;
        self.socket = self.ctx.option("socket");
        self.username = self.ctx.option_or("username", "root");
        self.password = self.ctx.option("password");
        self.database = self.ctx.database();
        self.tables = self.ctx.option_list("tables");
        self.exclude_tables = self.ctx.option_list("exclude_tables");
        self.args = self.ctx.extra_args()?;

        require_program(self.executor.as_ref(), "mysqldump")
    }

    fn perform(&self) -> Result<()> {
        info!("-> Dumping MySQL {}...", self.database);
        self.executor
            .run(&self.dump_command())
            .with_context(|| format!("mysqldump of {} failed", self.database))?;
        info!("dump path: {:?}", self.ctx.dump_path);
        Ok(())
    }
}
