//! Command tests for dbdump-manager
//!
//! These tests verify command behavior using mocked executors and tunnels.

mod list;
mod perform;
mod validate;
