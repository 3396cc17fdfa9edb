// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine-agnostic read requests

use super::row::{Row, SelectItem};
use super::table::{Column, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// "Select these columns (optionally pre-aggregated by count) from this table"
///
/// Produced by a `QueryOptimizer`; a table may be read through several
/// queries covering disjoint row ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    table: Table,
    select: Vec<SelectItem>,
    group_by: Vec<Column>,
    first_row: Option<u64>,
    max_rows: Option<u64>,
}

impl Query {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            select: Vec::new(),
            group_by: Vec::new(),
            first_row: None,
            max_rows: None,
        }
    }

    /// Select the given columns, skipping duplicates
    pub fn select_columns<'a>(mut self, columns: impl IntoIterator<Item = &'a Column>) -> Self {
        for column in columns {
            let item = SelectItem::Column(column.clone());
            if !self.select.contains(&item) {
                self.select.push(item);
            }
        }
        self
    }

    /// Add `COUNT(*)` and group by every selected column
    pub fn with_count_all(mut self) -> Self {
        if !self.has_count_all() {
            self.select.push(SelectItem::CountAll);
        }
        let group_by: Vec<Column> = self.columns().cloned().collect();
        self.group_by = group_by;
        self
    }

    /// Restrict the query to `max_rows` rows starting at the zero-based `first_row`
    pub fn with_range(mut self, first_row: u64, max_rows: u64) -> Self {
        self.first_row = Some(first_row);
        self.max_rows = Some(max_rows);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn select_items(&self) -> &[SelectItem] {
        &self.select
    }

    /// Shared header for rows produced by this query
    pub fn header(&self) -> Arc<[SelectItem]> {
        self.select.clone().into()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.select.iter().filter_map(|item| match item {
            SelectItem::Column(column) => Some(column),
            SelectItem::CountAll => None,
        })
    }

    pub fn group_by(&self) -> &[Column] {
        &self.group_by
    }

    pub fn first_row(&self) -> Option<u64> {
        self.first_row
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows
    }

    pub fn has_count_all(&self) -> bool {
        self.select.contains(&SelectItem::CountAll)
    }

    /// How many source rows `row` stands for
    ///
    /// Always 1 for plain queries. For count-aggregated queries the `COUNT(*)`
    /// value is used; a missing or non-numeric count defaults to 1.
    pub fn row_weight(&self, row: &Row) -> u64 {
        if !self.has_count_all() {
            return 1;
        }
        row.count_value().and_then(|value| value.as_count()).unwrap_or(1)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let select: Vec<String> = self.select.iter().map(|item| item.to_string()).collect();
        write!(f, "SELECT {} FROM {}", select.join(", "), self.table)?;
        if !self.group_by.is_empty() {
            let group_by: Vec<String> = self.group_by.iter().map(|c| c.to_string()).collect();
            write!(f, " GROUP BY {}", group_by.join(", "))?;
        }
        if let Some(first_row) = self.first_row {
            write!(f, " OFFSET {}", first_row)?;
        }
        if let Some(max_rows) = self.max_rows {
            write!(f, " LIMIT {}", max_rows)?;
        }
        Ok(())
    }
}
