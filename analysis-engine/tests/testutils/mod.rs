//! Test utilities for analysis engine integration tests
//!
//! - `fixtures`: in-memory data sources with generated tables
//! - `processors`: a value distribution processor and its factory
//! - `observers`: observers recording lifecycle events

#![allow(dead_code)]

pub mod fixtures;
pub mod observers;
pub mod processors;

/// Route `log` output through the test harness; honours `RUST_LOG`
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
