//! Before/after hook execution and the after-script policy
//!
//! Hook commands are tokenized with shell quoting rules and run directly,
//! without a shell. The `on_exit` policy decides whether the after hook runs
//! once a dump has failed.

use crate::utils::command::CommandSpec;
use crate::utils::executor::CommandExecutor;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// A user-configured command run around a dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hook {
    pub command: String,
    /// Log and swallow any failure instead of aborting
    pub ignore_failure: bool,
}

impl Hook {
    /// Parse the config convention: a leading `-` marks the hook as ignore-failure
    pub fn parse(script: &str) -> Self {
        match script.strip_prefix('-') {
            Some(rest) => Self {
                command: rest.to_string(),
                ignore_failure: true,
            },
            None => Self {
                command: script.to_string(),
                ignore_failure: false,
            },
        }
    }

    /// Parse an optional config value, treating a missing one as empty
    pub fn from_config(script: Option<&str>) -> Self {
        Self::parse(script.unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Run {action} failed: cannot parse command `{command}`")]
    Tokenize { action: String, command: String },

    #[error("Run {action} failed: {source}")]
    Failed {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Run a single hook to completion
///
/// Empty hooks succeed without running anything. Hooks marked
/// `ignore_failure` never return an error.
pub fn run_hook(
    executor: &dyn CommandExecutor,
    action: &str,
    hook: &Hook,
    working_dir: Option<&Path>,
) -> Result<(), HookError> {
    if hook.is_empty() {
        return Ok(());
    }

    info!("Run {}", action);

    let result = execute(executor, action, hook, working_dir);

    match result {
        Ok(()) => {
            info!("Run {} succeeded", action);
            Ok(())
        }
        Err(e) if hook.ignore_failure => {
            warn!("Run {} failed: {}, ignore it", action, e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn execute(
    executor: &dyn CommandExecutor,
    action: &str,
    hook: &Hook,
    working_dir: Option<&Path>,
) -> Result<(), HookError> {
    let tokens = shlex::split(&hook.command).ok_or_else(|| HookError::Tokenize {
        action: action.to_string(),
        command: hook.command.clone(),
    })?;

    let (program, args) = tokens.split_first().ok_or_else(|| HookError::Tokenize {
        action: action.to_string(),
        command: hook.command.clone(),
    })?;

    let mut spec = CommandSpec::new(program.as_str()).args(args.iter().cloned());
    if let Some(dir) = working_dir {
        spec = spec.current_dir(dir);
    }

    executor
        .run(&spec)
        .map(|_| ())
        .map_err(|source| HookError::Failed {
            action: action.to_string(),
            source,
        })
}

/// When the after hook runs if the dump failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OnExit {
    #[default]
    Unset,
    Always,
    Success,
    Failure,
    Other(String),
}

impl OnExit {
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or_default() {
            "" => OnExit::Unset,
            "always" => OnExit::Always,
            "success" => OnExit::Success,
            "failure" => OnExit::Failure,
            other => OnExit::Other(other.to_string()),
        }
    }
}

/// Whether the after hook should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterAction {
    Run,
    Skip,
}

/// Decide whether the after hook runs for a given dump outcome
///
/// A successful dump always runs it. A failed dump runs it only when a
/// script is configured and `on_exit` is `always` or `failure`.
pub fn after_script_action(
    perform_ok: bool,
    has_after_script: bool,
    on_exit: &OnExit,
) -> AfterAction {
    match (perform_ok, has_after_script, on_exit) {
        (true, _, _) => AfterAction::Run,
        (false, false, _) => AfterAction::Skip,
        (false, true, OnExit::Always | OnExit::Failure) => AfterAction::Run,
        (false, true, OnExit::Unset | OnExit::Success | OnExit::Other(_)) => AfterAction::Skip,
    }
}

/// Combine the dump result with the after hook result
///
/// A hook error always wins; otherwise the dump's own result stands.
pub fn combine_outcome(
    perform: anyhow::Result<()>,
    hook: Option<Result<(), HookError>>,
) -> anyhow::Result<()> {
    match hook {
        Some(Err(e)) => Err(e.into()),
        _ => perform,
    }
}
