//! Unit tests for dbdump-manager
//!
//! These tests exercise the library modules through their public API.

mod config;
mod hooks;
mod performers;
mod storage;
