// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data source contracts
//!
//! The engine reads through a `DataConnection`, which can be duplicated to
//! obtain independent handles for parallel reads. Each executed query yields
//! a `RowStream` that is pulled one row at a time.

pub mod memory;
pub mod stream;

pub use memory::MemoryDataContext;
pub use stream::{EmptyRowStream, ErrorRowStream, RowStream, VecRowStream};

use crate::exec::error::EngineError;
use crate::model::{Query, Table};
use std::sync::Arc;

/// A logical connection to a data source
pub trait DataConnection: Send + Sync {
    /// Execute a query and return its row stream
    fn execute_query(&self, query: &Query) -> Result<Box<dyn RowStream>, EngineError>;

    /// Obtain an independent handle for parallel use
    ///
    /// Sources that do not support concurrent connections return
    /// `EngineError::ConnectionDuplication`.
    fn duplicate(&self) -> Result<Arc<dyn DataConnection>, EngineError>;

    /// Number of rows in `table`, when the source can tell cheaply
    fn row_count(&self, _table: &Table) -> Option<u64> {
        None
    }
}
