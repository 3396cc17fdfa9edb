// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Analysis Engine - parallel execution of batch data-quality jobs
//!
//! An analysis job is a set of configurations, each naming a processor
//! (analyzer, profiler, validator) and the columns it consumes. The engine
//! reads every table those columns live on exactly as often as its query
//! plan requires, fans each row out to the table's processors and collects
//! one result per processor once its table has been read completely.
//!
//! # Features
//!
//! - **Table-scoped failures**: a failing processor or query only fails its own table
//! - **Bounded parallelism**: connection slots cap concurrent queries per connection
//! - **Query splitting**: large tables are read through row-range sub-queries
//! - **Group-by optimization**: duplicate rows arrive once, with a weight
//! - **Progress reporting**: push-based observers for init, begin, progress, success and failure
//!
//! # Usage
//!
//! ```ignore
//! use analysis_engine::{AnalysisRunner, JobConfiguration, MemoryDataContext};
//!
//! let runner = AnalysisRunner::new(MyFactory);
//! runner.add_configuration(JobConfiguration::new("Value distribution").with_columns(columns));
//! runner.execute(Arc::new(context), true)?;
//! for result in runner.results() { /* ... */ }
//! ```

pub mod config;
pub mod datasource;
pub mod exec;
pub mod model;
pub mod plan;
pub mod runner;

// Re-export the public API
pub use config::{ExecutionConfiguration, JobConfiguration};
pub use datasource::{DataConnection, MemoryDataContext, RowStream};
pub use exec::{
    ComponentFactory, EngineError, LoggingObserver, ProcessingError, ProcessorResult,
    ProgressObserver, RowProcessor, TableStatus,
};
pub use model::{Column, Query, Row, SelectItem, Table, Value};
pub use plan::{DefaultQueryOptimizer, QueryOptimizer, QueryPlan};
pub use runner::AnalysisRunner;

/// Analysis engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Analysis engine crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
