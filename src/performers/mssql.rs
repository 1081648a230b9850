//! Microsoft SQL Server exports via `sqlpackage`

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct MsSql {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    database: String,
    trust_server_certificate: bool,
    args: Vec<String>,
}

impl MsSql {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            host: String::new(),
            port: 1433,
            username: String::new(),
            password: None,
            database: String::new(),
            trust_server_certificate: false,
            args: Vec::new(),
        }
    }

    fn export_command(&self) -> CommandSpec {
        let target = self.ctx.dump_file(&format!("{}.bacpac", self.database));
        let mut cmd = CommandSpec::new("sqlpackage")
            .arg("/Action:Export")
            .arg(format!("/TargetFile:{}", target.display()))
            .arg(format!("/SourceServerName:{},{}", self.host, self.port))
            .arg(format!("/SourceDatabaseName:{}", self.database))
            .arg(format!("/SourceUser:{}", self.username));

        if let Some(ref password) = self.password {
            cmd = cmd.secret_arg(format!("/SourcePassword:{}", password));
        }
        if self.trust_server_certificate {
            cmd = cmd.arg("/SourceTrustServerCertificate:True");
        }

        cmd.args(self.args.iter().cloned())
    }
}

impl Performer for MsSql {
    fn init(&mut self) -> Result<()> {
        self.host = self.ctx.host("127.0.0.1");
        self.port = self.ctx.port(1433)?;
        self.username = self.ctx.option_or("username", "sa");
        self.password = self.ctx.option("password");
        self.database = self.ctx.database();
        self.trust_server_certificate = self.ctx.option_bool("trust_server_certificate");
        self.args = self.ctx.extra_args()?;

        require_program(self.executor.as_ref(), "sqlpackage")
    }

    fn perform(&self) -> Result<()> {
        info!("-> Exporting MSSQL {}...", self.database);
        self.executor
            .run(&self.export_command())
            .with_context(|| format!("sqlpackage export of {} failed", self.database))?;
        Ok(())
    }
}
