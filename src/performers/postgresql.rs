//! PostgreSQL dumps via `pg_dump`

use super::{require_program, DumpContext, Performer};
use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct PostgreSql {
    ctx: DumpContext,
    executor: Arc<dyn CommandExecutor>,
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    database: String,
    tables: Vec<String>,
    exclude_tables: Vec<String>,
    args: Vec<String>,
}

impl PostgreSql {
    pub fn new(ctx: DumpContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ctx,
            executor,
            host: String::new(),
            port: 5432,
            username: String::new(),
            password: None,
            database: String::new(),
            tables: Vec::new(),
            exclude_tables: Vec::new(),
            args: Vec::new(),
        }
    }

    fn dump_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("pg_dump")
            .arg(format!("--host={}", self.host))
            .arg(format!("--port={}", self.port))
            .arg(format!("--username={}", self.username));

        if let Some(ref password) = self.password {
            cmd = cmd.env("PGPASSWORD", password);
        }

        for table in &self.tables {
            cmd = cmd.arg(format!("--table={}", table));
        }
        for table in &self.exclude_tables {
            cmd = cmd.arg(format!("--exclude-table={}", table));
        }

        let dump_file = self.ctx.dump_file(&format!("{}.sql", self.database));
        cmd.args(self.args.iter().cloned())
            .arg(format!("--file={}", dump_file.display()))
            .arg(&self.database)
    }
}

impl Performer for PostgreSql {
    fn init(&mut self) -> Result<()> {
        self.host = self.ctx.host("localhost");
        self.port = self.ctx.port(5432)?;
        self.username = self.ctx.option_or("username", "postgres");
        self.password = self.ctx.option("password");
        self.database = self.ctx.database();
        self.tables = self.ctx.option_list("tables");
        self.exclude_tables = self.ctx.option_list("exclude_tables");
        self.args = self.ctx.extra_args()?;

        require_program(self.executor.as_ref(), "pg_dump")
    }

    fn perform(&self) -> Result<()> {
        info!("-> Dumping PostgreSQL {}...", self.database);
        self.executor
            .run(&self.dump_command())
            .with_context(|| format!("pg_dump of {} failed", self.database))?;
        info!("dump path: {:?}", self.ctx.dump_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performers::test_support::context;
    use crate::utils::executor::mock::MockExecutor;
    use tempfile::TempDir;

    #[test]
    fn test_dump_command() {
        let temp = TempDir::new().unwrap();
        let ctx = context(
            &temp,
            "postgresql",
            "username = \"backup\"\npassword = \"pw\"\ntables = [\"public.users\"]\nexclude_tables = \"audit logs\"",
        );
        let dump_file = ctx.dump_file("app.sql");
        let executor = MockExecutor::new();
        let mut pg = PostgreSql::new(ctx, Arc::new(executor.clone()));

        pg.init().unwrap();
        pg.perform().unwrap();

        let call = executor.last_call("pg_dump").unwrap();
        assert_eq!(
            call.args,
            vec![
                "--host=localhost".to_string(),
                "--port=5432".to_string(),
                "--username=backup".to_string(),
                "--table=public.users".to_string(),
                "--exclude-table=audit".to_string(),
                "--exclude-table=logs".to_string(),
                format!("--file={}", dump_file.display()),
                "app".to_string(),
            ]
        );
        assert_eq!(call.env_value("PGPASSWORD"), Some("pw"));
    }

    #[test]
    fn test_perform_failure_has_context() {
        let temp = TempDir::new().unwrap();
        let executor = MockExecutor::new().failing("pg_dump", "connection refused");
        let mut pg = PostgreSql::new(context(&temp, "postgresql", ""), Arc::new(executor));

        pg.init().unwrap();
        let err = pg.perform().unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
        assert!(err.to_string().contains("pg_dump of app failed"));
    }
}
