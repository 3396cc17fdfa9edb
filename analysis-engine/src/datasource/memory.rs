// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory data source for testing and embedding

use super::stream::{RowStream, VecRowStream};
use super::DataConnection;
use crate::exec::error::EngineError;
use crate::model::{Column, Query, Row, Table, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory data source
///
/// Supports column projection, `COUNT(*) ... GROUP BY` and row ranges. All
/// duplicates share the same tables. An optional connection limit makes
/// `duplicate()` fail once that many handles exist, like a source that does
/// not support concurrent connections.
#[derive(Clone)]
pub struct MemoryDataContext {
    tables: Arc<RwLock<HashMap<Table, Arc<MemoryTable>>>>,
    open_connections: Arc<AtomicUsize>,
    connection_limit: Option<usize>,
    executed: Arc<Mutex<Vec<Query>>>,
}

/// In-memory table contents
struct MemoryTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl MemoryDataContext {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            open_connections: Arc::new(AtomicUsize::new(1)),
            connection_limit: None,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Limit the total number of handles (the first one plus duplicates)
    pub fn with_connection_limit(mut self, limit: usize) -> Self {
        self.connection_limit = Some(limit);
        self
    }

    /// Register a table, replacing any previous contents
    ///
    /// Returns the created columns in declaration order.
    pub fn add_table(
        &self,
        table: &Table,
        column_names: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Vec<Column> {
        let columns: Vec<Column> = column_names.iter().map(|name| table.column(name)).collect();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns.len(), Value::Null);
                row
            })
            .collect();

        self.tables.write().insert(
            table.clone(),
            Arc::new(MemoryTable {
                columns: columns.clone(),
                rows,
            }),
        );
        columns
    }

    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.tables.read().keys().cloned().collect();
        tables.sort();
        tables
    }

    /// Number of handles created so far, the first one included
    pub fn connection_count(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Every query executed through this context or its duplicates
    pub fn executed_queries(&self) -> Vec<Query> {
        self.executed.lock().clone()
    }

    fn project(table: &MemoryTable, query: &Query) -> Result<Vec<Vec<Value>>, EngineError> {
        let indexes = query
            .columns()
            .map(|column| {
                table
                    .columns
                    .iter()
                    .position(|candidate| candidate == column)
                    .ok_or_else(|| EngineError::Query(format!("Column not found: {}", column)))
            })
            .collect::<Result<Vec<usize>, EngineError>>()?;

        Ok(table
            .rows
            .iter()
            .map(|row| indexes.iter().map(|&index| row[index].clone()).collect())
            .collect())
    }

    fn group_and_count(rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, i64)> = Vec::new();

        for row in rows {
            match positions.get(&row) {
                Some(&position) => groups[position].1 += 1,
                None => {
                    positions.insert(row.clone(), groups.len());
                    groups.push((row, 1));
                }
            }
        }

        groups
            .into_iter()
            .map(|(mut values, count)| {
                values.push(Value::Integer(count));
                values
            })
            .collect()
    }
}

impl Default for MemoryDataContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DataConnection for MemoryDataContext {
    fn execute_query(&self, query: &Query) -> Result<Box<dyn RowStream>, EngineError> {
        let table = self
            .tables
            .read()
            .get(query.table())
            .cloned()
            .ok_or_else(|| EngineError::Query(format!("Table not found: {}", query.table())))?;

        self.executed.lock().push(query.clone());

        let mut values = Self::project(&table, query)?;
        if query.has_count_all() {
            values = Self::group_and_count(values);
        }

        let first_row = query.first_row().unwrap_or(0) as usize;
        let max_rows = query.max_rows().map(|n| n as usize).unwrap_or(usize::MAX);
        let header = query.header();
        let rows: Vec<Row> = values
            .into_iter()
            .skip(first_row)
            .take(max_rows)
            .map(|values| Row::new(header.clone(), values))
            .collect();

        log::debug!("Memory query '{}' produced {} rows", query, rows.len());
        Ok(Box::new(VecRowStream::new(rows)))
    }

    fn duplicate(&self) -> Result<Arc<dyn DataConnection>, EngineError> {
        let previous = self.open_connections.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.connection_limit {
            if previous >= limit {
                self.open_connections.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::ConnectionDuplication(format!(
                    "data source supports at most {} connections",
                    limit
                )));
            }
        }
        Ok(Arc::new(self.clone()))
    }

    fn row_count(&self, table: &Table) -> Option<u64> {
        self.tables.read().get(table).map(|t| t.rows.len() as u64)
    }
}
