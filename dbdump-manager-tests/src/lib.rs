//! Test utilities for dbdump-manager
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing the dbdump-manager application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(
//!         ConfigBuilder::minimal().add_database("daily", "cache", "redis"),
//!     );
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use dbdump_manager::config::{
    Config, DatabaseConfig, GlobalConfig, ModelConfig, ResolvedModel, StorageConfig, StorageType,
};

// Re-export mock implementations from the main crate
pub use dbdump_manager::managers::tunnel::mock::{
    MockTunnelBehavior, MockTunnelFactory, TunnelLog,
};
pub use dbdump_manager::utils::executor::mock::{MockExecutor, MockResponse};
pub use dbdump_manager::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
