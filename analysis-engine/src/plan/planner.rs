// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Job planning
//!
//! Groups the submitted configurations by the tables their columns live on
//! and asks the query optimizer how each table should be read.

use crate::config::{ExecutionConfiguration, JobConfiguration};
use crate::datasource::DataConnection;
use crate::exec::error::EngineError;
use crate::model::{Column, Table};
use crate::plan::optimizer::{QueryOptimizer, QueryPlan};
use std::sync::Arc;

/// A configuration together with its columns on one table
#[derive(Debug, Clone)]
pub struct ConfigurationAssignment {
    pub configuration: Arc<JobConfiguration>,
    pub columns: Vec<Column>,
}

/// Everything that reads one table
#[derive(Debug, Clone)]
pub struct TableAssignment {
    pub table: Table,
    /// De-duplicated union of the columns the configurations need
    pub columns: Vec<Column>,
    pub configurations: Vec<ConfigurationAssignment>,
}

#[derive(Debug, Clone)]
pub struct TablePlan {
    pub assignment: TableAssignment,
    pub query_plan: QueryPlan,
}

impl TablePlan {
    pub fn table(&self) -> &Table {
        &self.assignment.table
    }
}

/// Execution plan of a whole job, one entry per table in first-seen order
#[derive(Debug, Clone, Default)]
pub struct JobPlan {
    pub tables: Vec<TablePlan>,
}

impl JobPlan {
    pub fn tables(&self) -> Vec<Table> {
        self.tables.iter().map(|plan| plan.table().clone()).collect()
    }

    pub fn query_count(&self) -> usize {
        self.tables.iter().map(|plan| plan.query_plan.query_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

pub struct JobPlanner {
    optimizer: Arc<dyn QueryOptimizer>,
}

impl JobPlanner {
    pub fn new(optimizer: Arc<dyn QueryOptimizer>) -> Self {
        Self { optimizer }
    }

    /// Assign every configuration to the tables it has columns on
    pub fn group_by_table(configurations: &[Arc<JobConfiguration>]) -> Vec<TableAssignment> {
        let mut all_columns: Vec<&Column> = Vec::new();
        for column in configurations.iter().flat_map(|c| c.columns()) {
            if !all_columns.contains(&column) {
                all_columns.push(column);
            }
        }

        let mut tables: Vec<&Table> = Vec::new();
        for column in &all_columns {
            if !tables.contains(&column.table()) {
                tables.push(column.table());
            }
        }

        tables
            .into_iter()
            .map(|table| {
                let columns = all_columns
                    .iter()
                    .filter(|column| column.belongs_to(table))
                    .map(|column| (*column).clone())
                    .collect();

                let configurations = configurations
                    .iter()
                    .filter_map(|configuration| {
                        let columns = configuration.columns_for_table(table);
                        if columns.is_empty() {
                            None
                        } else {
                            Some(ConfigurationAssignment {
                                configuration: Arc::clone(configuration),
                                columns,
                            })
                        }
                    })
                    .collect();

                TableAssignment {
                    table: table.clone(),
                    columns,
                    configurations,
                }
            })
            .collect()
    }

    /// Validate the configurations and plan the sub-queries of every table
    pub fn plan(
        &self,
        configurations: &[Arc<JobConfiguration>],
        execution: &ExecutionConfiguration,
        connection: &dyn DataConnection,
    ) -> Result<JobPlan, EngineError> {
        if let Some(empty) = configurations.iter().find(|c| c.columns().is_empty()) {
            return Err(EngineError::Planning(format!(
                "configuration '{}' has no input columns",
                empty.descriptor()
            )));
        }

        let mut tables = Vec::new();
        for assignment in Self::group_by_table(configurations) {
            let query_plan = self
                .optimizer
                .optimize(&assignment.table, &assignment.columns, execution, connection)
                .map_err(|error| match error {
                    EngineError::Planning(_) => error,
                    other => EngineError::Planning(format!(
                        "failed to plan queries for table {}: {}",
                        assignment.table, other
                    )),
                })?;

            log::debug!(
                "Planned table {}: {} columns, {} configurations, {} sub-queries",
                assignment.table,
                assignment.columns.len(),
                assignment.configurations.len(),
                query_plan.query_count()
            );
            tables.push(TablePlan {
                assignment,
                query_plan,
            });
        }

        Ok(JobPlan { tables })
    }
}
