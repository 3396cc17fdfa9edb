// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Table and column identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a physical table in a data source
///
/// Cheap to clone; two tables are the same table when schema and name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Table {
    schema: Option<Arc<str>>,
    name: Arc<str>,
}

impl Table {
    /// Create a table without a schema qualifier
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            schema: None,
            name: Arc::from(name.as_ref()),
        }
    }

    /// Create a schema-qualified table
    pub fn with_schema(schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            schema: Some(Arc::from(schema.as_ref())),
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Build a column belonging to this table
    pub fn column(&self, name: impl AsRef<str>) -> Column {
        Column::new(self.clone(), name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A column of a physical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column {
    table: Table,
    name: Arc<str>,
}

impl Column {
    pub fn new(table: Table, name: impl AsRef<str>) -> Self {
        Self {
            table,
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn belongs_to(&self, table: &Table) -> bool {
        &self.table == table
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}
