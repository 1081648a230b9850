//! Backup manager - orchestrates database dumps for a model

use crate::config::{DatabaseConfig, ResolvedModel};
use crate::managers::hooks::{
    after_script_action, combine_outcome, run_hook, AfterAction, Hook, OnExit,
};
use crate::managers::tunnel::TunnelManager;
use crate::performers::{DumpContext, PerformerRegistry};
use crate::storage;
use crate::utils::executor::CommandExecutor;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

pub struct BackupManager {
    registry: PerformerRegistry,
    executor: Arc<dyn CommandExecutor>,
    tunnels: TunnelManager,
}

impl BackupManager {
    pub fn new(
        registry: PerformerRegistry,
        executor: Arc<dyn CommandExecutor>,
        tunnels: TunnelManager,
    ) -> Self {
        Self {
            registry,
            executor,
            tunnels,
        }
    }

    /// Dump a model and hand the result to its storage
    pub fn perform_model(&self, model: &ResolvedModel) -> Result<()> {
        self.run(model)?;

        if let Some(key) = storage::run(model, Arc::clone(&self.executor))
            .with_context(|| format!("Storing dumps of model '{}' failed", model.name))?
        {
            info!("Model '{}' stored as {}", model.name, key);
        }
        Ok(())
    }

    /// Perform every model; a failed model does not stop the others
    pub fn perform_all(&self, models: &BTreeMap<String, ResolvedModel>) -> Result<()> {
        if models.is_empty() {
            warn!("No models to perform");
            return Ok(());
        }

        let mut success_count = 0;
        let mut errors = Vec::new();

        for (name, model) in models {
            match self.perform_model(model) {
                Ok(()) => success_count += 1,
                Err(e) => {
                    error!("Failed to perform model '{}': {:#}", name, e);
                    errors.push(format!("{}: {:#}", name, e));
                }
            }
        }

        info!(
            "Performed {} model(s), {} failed",
            success_count,
            errors.len()
        );

        if !errors.is_empty() {
            anyhow::bail!(
                "{} model(s) failed: {}",
                errors.len(),
                errors.join("; ")
            );
        }
        Ok(())
    }

    /// Dump every database of a model in order, stopping at the first failure
    pub fn run(&self, model: &ResolvedModel) -> Result<()> {
        let span = info_span!("model", name = %model.name);
        let _enter = span.enter();

        let start_time = Instant::now();
        info!("Starting dumps for model: {}", model.name);

        // Leftovers of an earlier failed run must not reach storage
        if model.dump_path.exists() {
            info!("Removing stale dumps in {:?}", model.dump_path);
            fs::remove_dir_all(&model.dump_path).with_context(|| {
                format!("Failed to clear dump path {:?}", model.dump_path)
            })?;
        }

        for db in &model.databases {
            self.run_database(model, db)
                .with_context(|| format!("{} {} failed", db.db_type, db.name))?;
        }

        info!(
            "Dumps for model '{}' completed in {:.2}s",
            model.name,
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Dump a single database with its hooks and tunnel
    pub fn run_database(&self, model: &ResolvedModel, db: &DatabaseConfig) -> Result<()> {
        let span = info_span!("database", "type" = %db.db_type, name = %db.name);
        let _enter = span.enter();

        let ctx = DumpContext::new(model, db);
        let tunnel_settings = ctx.tunnel.clone();

        let Some(mut performer) = self.registry.build(ctx, Arc::clone(&self.executor)) else {
            warn!(
                "databases.{} has type `{}` with no performer, skip it",
                db.name, db.db_type
            );
            return Ok(());
        };

        info!("=> database | {}: {}", db.db_type, db.name);

        let before = Hook::from_config(db.before_script.as_deref());
        run_hook(
            self.executor.as_ref(),
            "dump before_script",
            &before,
            Some(&model.work_dir),
        )?;

        performer.init()?;

        let perform_result = match tunnel_settings {
            Some(ref settings) => {
                let mut handle = self.tunnels.open(settings);
                if let Err(e) = self.tunnels.wait_ready(&mut handle) {
                    handle.close();
                    return Err(e).context("SSH tunnel did not become ready");
                }
                let result = performer.perform();
                handle.close();
                result
            }
            None => performer.perform(),
        };

        match perform_result {
            Ok(()) => info!("Dump succeeded"),
            Err(ref e) => error!("Dump failed: {:#}", e),
        }

        let after = Hook::from_config(db.after_script.as_deref());
        let on_exit = OnExit::parse(db.on_exit.as_deref());
        let action = after_script_action(perform_result.is_ok(), !after.is_empty(), &on_exit);

        if perform_result.is_err() && !after.is_empty() {
            match on_exit {
                OnExit::Unset => info!("on_exit is unset, skip after_script"),
                OnExit::Other(ref value) => {
                    warn!("on_exit '{}' is not recognized, skip after_script", value)
                }
                OnExit::Success => info!("on_exit is success, skip after_script"),
                OnExit::Always | OnExit::Failure => {}
            }
        }

        let hook_result = match action {
            AfterAction::Run => Some(run_hook(
                self.executor.as_ref(),
                "dump after_script",
                &after,
                Some(&model.work_dir),
            )),
            AfterAction::Skip => None,
        };

        combine_outcome(perform_result, hook_result)
    }
}
