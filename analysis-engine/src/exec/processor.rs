// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Processor contracts
//!
//! Processors are created by an external `ComponentFactory`, one per
//! configuration and table, and consumed when their table succeeds.

use crate::config::{ExecutionConfiguration, JobConfiguration};
use crate::exec::error::{EngineError, ProcessingError};
use crate::model::{Column, Row};
use std::sync::Arc;

/// A stateful consumer of rows (analyzer, profiler, validator)
///
/// Not required to be thread-safe: the engine serializes calls per instance,
/// while different instances may run concurrently on the same row.
pub trait RowProcessor<R>: Send {
    /// Consume one row standing for `weight` source rows
    fn process(&mut self, row: &Row, weight: u64) -> Result<(), ProcessingError>;

    /// Produce the final result; called once, after every row of the table
    fn into_result(self: Box<Self>) -> R;
}

/// Turns a configuration into a runnable processor
pub trait ComponentFactory<R>: Send + Sync {
    /// `columns` is the configuration's column subset for a single table
    fn create(
        &self,
        configuration: &JobConfiguration,
        columns: &[Column],
        execution: &ExecutionConfiguration,
    ) -> Result<Box<dyn RowProcessor<R>>, EngineError>;
}

impl<R, F> ComponentFactory<R> for F
where
    F: Fn(
            &JobConfiguration,
            &[Column],
            &ExecutionConfiguration,
        ) -> Result<Box<dyn RowProcessor<R>>, EngineError>
        + Send
        + Sync,
{
    fn create(
        &self,
        configuration: &JobConfiguration,
        columns: &[Column],
        execution: &ExecutionConfiguration,
    ) -> Result<Box<dyn RowProcessor<R>>, EngineError> {
        self(configuration, columns, execution)
    }
}

/// Output of one processor for one table
#[derive(Debug, Clone)]
pub struct ProcessorResult<R> {
    pub configuration: Arc<JobConfiguration>,
    pub columns: Vec<Column>,
    pub result: R,
}
