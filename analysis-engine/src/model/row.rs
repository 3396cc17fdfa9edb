// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Streamed rows and their select-item headers

use super::table::Column;
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One projected item of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectItem {
    Column(Column),
    /// `COUNT(*)` added by the group-by optimization
    CountAll,
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Column(column) => write!(f, "{}", column),
            SelectItem::CountAll => write!(f, "COUNT(*)"),
        }
    }
}

/// A single retrieved record
///
/// The select-item header is shared between all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    items: Arc<[SelectItem]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row; `values` is truncated or padded with nulls to match `items`
    pub fn new(items: Arc<[SelectItem]>, mut values: Vec<Value>) -> Self {
        values.resize(items.len(), Value::Null);
        Self { items, values }
    }

    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, item: &SelectItem) -> Option<&Value> {
        self.items
            .iter()
            .position(|candidate| candidate == item)
            .map(|index| &self.values[index])
    }

    /// Value of a selected column, `None` if the column is not part of the row
    pub fn value(&self, column: &Column) -> Option<&Value> {
        self.items
            .iter()
            .position(|item| matches!(item, SelectItem::Column(c) if c == column))
            .map(|index| &self.values[index])
    }

    /// Value of the `COUNT(*)` item, if the row carries one
    pub fn count_value(&self) -> Option<&Value> {
        self.get(&SelectItem::CountAll)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row[")?;
        for (i, (item, value)) in self.items.iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", item, value)?;
        }
        write!(f, "]")
    }
}
