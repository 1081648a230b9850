//! MongoDB dumps via `mongodump`

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct MongoDb {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    auth_db: String,
    database: String,
    exclude_collections: Vec<String>,
    oplog: bool,
    args: Vec<String>,
}

impl MongoDb {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            host: String::new(),
            port: 27017,
            username: None,
            password: None,
            auth_db: String::new(),
            database: String::new(),
            exclude_collections: Vec::new(),
            oplog: false,
            args: Vec::new(),
        }
    }

    fn dump_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("mongodump")
            .arg(format!("--db={}", self.database))
            .arg(format!("--host={}", self.host))
            .arg(format!("--port={}", self.port));

        if let Some(ref username) = self.username {
            cmd = cmd
                .arg(format!("--username={}", username))
                .arg(format!("--authenticationDatabase={}", self.auth_db));
        }
        if let Some(ref password) = self.password {
            cmd = cmd.arg("--password").secret_arg(password);
        }

        for collection in &self.exclude_collections {
            cmd = cmd.arg(format!("--excludeCollection={}", collection));
        }
        if self.oplog {
            cmd = cmd.arg("--oplog");
        }

        cmd.args(self.args.iter().cloned())
            .arg(format!("--out={}", self.ctx.dump_path.display()))
    }
}

impl Performer for MongoDb {
    fn init(&mut self) -> Result<()> {
        self.host = self.ctx.host("127.0.0.1");
        self.port = self.ctx.port(27017)?;
        self.username = self.ctx.option("username");
        self.password = self.ctx.option("password");
        self.auth_db = self.ctx.option_or("authdb", "admin");
        self.database = self.ctx.database();
        self.exclude_collections = self.ctx.option_list("exclude_tables");
        self.oplog = self.ctx.option_bool("oplog");
        self.args = self.ctx.extra_args()?;

        require_program(self.executor.as_ref(), "mongodump")
    }

    fn perform(&self) -> Result<()> {
        info!("-> Dumping MongoDB {}...", self.database);
        self.executor
            .run(&self.dump_command())
            .with_context(|| format!("mongodump of {} failed", self.database))?;
        info!("dump path: {:?}", self.ctx.dump_path);
        Ok(())
    }
}
