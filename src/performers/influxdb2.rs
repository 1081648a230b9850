//! InfluxDB 2.x backups via `influx backup`

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct InfluxDb2 {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    host: String,
    token: String,
    bucket: Option<String>,
    bucket_id: Option<String>,
    org: Option<String>,
    org_id: Option<String>,
    skip_verify: bool,
}

impl InfluxDb2 {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            host: String::new(),
            token: String::new(),
            bucket: None,
            bucket_id: None,
            org: None,
            org_id: None,
            skip_verify: false,
        }
    }

    fn backup_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("influx")
            .arg("backup")
            .arg(self.ctx.dump_path.display().to_string())
            .arg(format!("--host={}", self.host))
            .env("INFLUX_TOKEN", &self.token);

        let filters = [
            ("--bucket", &self.bucket),
            ("--bucket-id", &self.bucket_id),
            ("--org", &self.org),
            ("--org-id", &self.org_id),
        ];
        for (flag, value) in filters {
            if let Some(value) = value {
                cmd = cmd.arg(format!("{}={}", flag, value));
            }
        }

        if self.skip_verify {
            cmd = cmd.arg("--skip-verify");
        }
        cmd
    }
}

impl Performer for InfluxDb2 {
    fn init(&mut self) -> Result<()> {
        self.host = match self.ctx.tunnel {
            Some(ref tunnel) => format!("http://127.0.0.1:{}", tunnel.local_port),
            None => self
                .ctx
                .option("host")
                .with_context(|| format!("{}: influxdb2 requires host", self.ctx.name))?,
        };
        self.token = self
            .ctx
            .option("token")
            .with_context(|| format!("{}: influxdb2 requires token", self.ctx.name))?;
        self.bucket = self.ctx.option("bucket");
        self.bucket_id = self.ctx.option("bucket_id");
        self.org = self.ctx.option("org");
        self.org_id = self.ctx.option("org_id");
        self.skip_verify = self.ctx.option_bool("skip_verify");

        require_program(self.executor.as_ref(), "influx")
    }

    fn perform(&self) -> Result<()> {
        info!("-> Backing up InfluxDB2 {}...", self.host);
        self.executor
            .run(&self.backup_command())
            .with_context(|| format!("influx backup from {} failed", self.host))?;
        Ok(())
    }
}
