// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-table result store

use crate::exec::processor::ProcessorResult;
use crate::model::Table;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Results of successfully completed tables, keyed by table
///
/// A table's entry is written once, by its delegate, when the table succeeds.
pub struct ResultStore<R> {
    results: RwLock<HashMap<Table, Vec<ProcessorResult<R>>>>,
    order: RwLock<Vec<Table>>,
}

impl<R> ResultStore<R> {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn publish(&self, table: &Table, results: Vec<ProcessorResult<R>>) {
        let mut store = self.results.write();
        if store.insert(table.clone(), results).is_none() {
            self.order.write().push(table.clone());
        }
    }

    pub fn contains(&self, table: &Table) -> bool {
        self.results.read().contains_key(table)
    }

    /// Tables with results, in completion order
    pub fn tables(&self) -> Vec<Table> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

impl<R: Clone> ResultStore<R> {
    pub fn for_table(&self, table: &Table) -> Option<Vec<ProcessorResult<R>>> {
        self.results.read().get(table).cloned()
    }

    /// All results, grouped by table in completion order
    pub fn all(&self) -> Vec<ProcessorResult<R>> {
        let store = self.results.read();
        self.order
            .read()
            .iter()
            .filter_map(|table| store.get(table))
            .flat_map(|results| results.iter().cloned())
            .collect()
    }
}

impl<R> Default for ResultStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
