// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Processor configurations submitted to a job

use crate::exec::error::EngineError;
use crate::model::{Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pairing of a processor descriptor and the columns it consumes
///
/// The engine only reads the column set; descriptor and properties are
/// handed to the `ComponentFactory` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfiguration {
    descriptor: String,
    columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, serde_json::Value>,
}

impl JobConfiguration {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            columns: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns = columns.into_iter().collect();
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    /// The configured columns that belong to `table`, in configured order
    pub fn columns_for_table(&self, table: &Table) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|column| column.belongs_to(table))
            .cloned()
            .collect()
    }
}
