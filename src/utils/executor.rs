//! Command execution abstraction for testability
//!
//! Hooks, performers and storage all run external programs through
//! [`CommandExecutor`] so tests can swap in [`mock::MockExecutor`].

use super::command::CommandSpec;
use anyhow::Result;
use std::process::Output;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion; non-zero exit is an error
    fn run(&self, spec: &CommandSpec) -> Result<Output>;

    /// Whether a program can be found on PATH
    fn program_exists(&self, program: &str) -> bool;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<Output> {
        super::command::run_command(spec)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String },
        Failure { stderr: String, exit_code: i32 },
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
            }
        }
    }

    impl MockResponse {
        pub fn failure(stderr: &str) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code: 1,
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        calls: Arc<Mutex<Vec<CommandSpec>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Programs reported as not installed
        missing: Arc<Mutex<HashSet<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Make a program fail with the given stderr
        pub fn failing(self, program: &str, stderr: &str) -> Self {
            self.expect(program, MockResponse::failure(stderr))
        }

        /// Report a program as missing from PATH
        pub fn without_program(self, program: &str) -> Self {
            self.missing.lock().unwrap().insert(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        /// Names of the programs that were run, in order
        pub fn programs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.program.clone())
                .collect()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        /// Last recorded call to a program
        pub fn last_call(&self, program: &str) -> Option<CommandSpec> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|c| c.program == program)
                .cloned()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run(&self, spec: &CommandSpec) -> Result<Output> {
            self.calls.lock().unwrap().push(spec.clone());

            let response = self
                .responses
                .lock()
                .unwrap()
                .get(&spec.program)
                .cloned()
                .unwrap_or_default();

            match response {
                MockResponse::Success { stdout } => Ok(Output {
                    status: std::process::ExitStatus::default(),
                    stdout: stdout.into_bytes(),
                    stderr: Vec::new(),
                }),
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", exit_code, stderr)
                }
            }
        }

        fn program_exists(&self, program: &str) -> bool {
            !self.missing.lock().unwrap().contains(program)
        }
    }
}
