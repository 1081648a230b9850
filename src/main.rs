use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbdump_manager::config::{self, ResolvedModel};
use dbdump_manager::managers::logging::{self, LoggingConfig};
use dbdump_manager::storage;
use dbdump_manager::utils::{RealExecutor, SshTunnelFactory};
use dbdump_manager::{BackupManager, PerformerRegistry, TunnelManager};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dbdump-manager")]
#[command(about = "Database dump orchestration with hooks and SSH tunnels", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "dbdump.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump all models or a specific model, then store the dumps
    Perform {
        /// Specific model to perform (defaults to all models)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// List all configured models and their databases
    List,

    /// List stored dumps of a model
    Files {
        #[arg(short, long)]
        model: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;

    // If no command specified, list models
    let command = cli.command.unwrap_or(Commands::List);

    match command {
        Commands::Perform { model } => {
            // Setup logging with file rotation (must keep guard alive)
            let _log_guard = logging::init_logging(&LoggingConfig::from_global(&config.global))?;

            let models: BTreeMap<String, ResolvedModel> = match model {
                Some(name) => {
                    let resolved = config::resolve_named_model(&name, &config)?;
                    BTreeMap::from([(name, resolved)])
                }
                None => config::resolve_all_models(&config)?,
            };

            let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            let tunnels = TunnelManager::new(
                runtime.handle().clone(),
                Arc::new(SshTunnelFactory),
                Duration::from_secs(config.global.tunnel_ready_timeout_seconds),
            );
            let manager = BackupManager::new(
                PerformerRegistry::with_builtin(),
                Arc::new(RealExecutor::new()),
                tunnels,
            );

            manager.perform_all(&models)?;
            println!("✓ Performed {} model(s)", models.len());
        }

        Commands::Validate => {
            logging::init_console_logging();
            let models = config::resolve_all_models(&config)?;
            let registry = PerformerRegistry::with_builtin();

            println!("Configuration is valid!");
            println!("Models: {}", models.len());
            for (name, model) in &models {
                for db in &model.databases {
                    if !registry.contains(&db.db_type) {
                        println!(
                            "  warning: {}.{} has unsupported type '{}' and will be skipped",
                            name, db.name, db.db_type
                        );
                    }
                }
            }
        }

        Commands::List => {
            logging::init_console_logging();
            let models = config::resolve_all_models(&config)?;

            println!("Configured models:");
            for (name, model) in &models {
                println!("  {}", name);
                if !model.description.is_empty() {
                    println!("    Description: {}", model.description);
                }
                println!("    Work dir: {}", model.work_dir.display());
                for db in &model.databases {
                    let via = db
                        .ssh_host
                        .as_deref()
                        .map(|h| format!(" (via ssh {})", h))
                        .unwrap_or_default();
                    println!("    - {} [{}]{}", db.name, db.db_type, via);
                }
                match model.storage {
                    Some(ref s) => println!("    Storage: {}", s.path.display()),
                    None => println!("    Storage: none"),
                }
                println!();
            }
        }

        Commands::Files { model, json } => {
            logging::init_console_logging();
            let resolved = config::resolve_named_model(&model, &config)?;
            let storage_config = resolved
                .storage
                .as_ref()
                .with_context(|| format!("Model '{}' has no storage configured", model))?;

            let backend = storage::new_storage(
                &resolved.name,
                storage_config,
                &resolved.dump_path,
                Arc::new(RealExecutor::new()),
            );
            let files = backend.list("")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                println!("=== Stored dumps for model: {} ===\n", model);
                if files.is_empty() {
                    println!("No stored dumps");
                }
                for file in &files {
                    println!(
                        "  {}  {:>12} bytes  {}",
                        file.filename,
                        file.size,
                        file.last_modified.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
    }

    Ok(())
}
