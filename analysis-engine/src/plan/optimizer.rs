// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sub-query generation for a single table

use crate::config::ExecutionConfiguration;
use crate::datasource::DataConnection;
use crate::exec::error::EngineError;
use crate::model::{Column, Query, Table};

/// The sub-queries that together read one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Rows the table is expected to yield, reported to observers on `begin`
    pub estimated_row_count: Option<u64>,
    pub queries: Vec<Query>,
}

impl QueryPlan {
    pub fn new(estimated_row_count: Option<u64>, queries: Vec<Query>) -> Self {
        Self {
            estimated_row_count,
            queries,
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }
}

/// Turns "read these columns of this table" into executable sub-queries
pub trait QueryOptimizer: Send + Sync {
    fn optimize(
        &self,
        table: &Table,
        columns: &[Column],
        execution: &ExecutionConfiguration,
        connection: &dyn DataConnection,
    ) -> Result<QueryPlan, EngineError>;
}

/// Column projection, optional `COUNT(*)` grouping and row-range splitting
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryOptimizer;

impl DefaultQueryOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Number of row-range queries needed to cover `row_count` rows
    fn split_count(row_count: u64, split_size: u64) -> u64 {
        row_count.div_ceil(split_size)
    }
}

impl QueryOptimizer for DefaultQueryOptimizer {
    fn optimize(
        &self,
        table: &Table,
        columns: &[Column],
        execution: &ExecutionConfiguration,
        connection: &dyn DataConnection,
    ) -> Result<QueryPlan, EngineError> {
        if let Some(foreign) = columns.iter().find(|column| !column.belongs_to(table)) {
            return Err(EngineError::Planning(format!(
                "column {} does not belong to table {}",
                foreign, table
            )));
        }

        let mut base = Query::new(table.clone()).select_columns(columns);
        if execution.is_group_by_optimization_enabled() {
            base = base.with_count_all();
        }

        let row_count = connection.row_count(table);
        let queries = match (execution.query_split_size(), row_count) {
            (Some(split_size), Some(count)) if count > split_size => {
                let parts = Self::split_count(count, split_size);
                log::debug!(
                    "Splitting query on {} ({} rows) into {} parts of {} rows",
                    table,
                    count,
                    parts,
                    split_size
                );
                (0..parts)
                    .map(|part| base.clone().with_range(part * split_size, split_size))
                    .collect()
            }
            _ => vec![base],
        };

        Ok(QueryPlan::new(row_count, queries))
    }
}
