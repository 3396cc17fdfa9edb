// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Progress observers and the hub that broadcasts to them

use crate::exec::error::EngineError;
use crate::model::Table;
use parking_lot::RwLock;
use std::sync::Arc;

/// Push-only receiver of job lifecycle events
///
/// Events for one table are delivered in order (`begin`, zero or more
/// `progress`, then exactly one of `success` / `failure`); events for
/// different tables may interleave and arrive from different threads.
///
/// Notifications are sent without any table state locked, so an observer may
/// query the status of any table, the notified one included. By the time
/// `success` arrives the table's results are already published.
pub trait ProgressObserver: Send + Sync {
    /// All tables of the job, before any table begins
    fn init(&self, tables: &[Table]);

    fn begin(&self, table: &Table, estimated_rows: Option<u64>);

    /// `row_delta` source rows were processed since the previous notification
    fn progress(&self, table: &Table, row_delta: u64);

    fn success(&self, table: &Table, row_count: u64);

    fn failure(&self, table: &Table, cause: &EngineError, rows_processed: u64);
}

/// Broadcasts lifecycle events to every registered observer
#[derive(Default)]
pub struct ObserverHub {
    observers: RwLock<Vec<Arc<dyn ProgressObserver>>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn ProgressObserver>) {
        self.observers.write().push(observer);
    }

    /// Remove a previously added observer; returns whether it was registered
    pub fn remove(&self, observer: &Arc<dyn ProgressObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|candidate| !Arc::ptr_eq(candidate, observer));
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    // Observers are snapshotted so callbacks may (de)register without deadlocking
    fn snapshot(&self) -> Vec<Arc<dyn ProgressObserver>> {
        self.observers.read().clone()
    }

    pub fn init(&self, tables: &[Table]) {
        log::debug!("notify init: {} tables", tables.len());
        for observer in self.snapshot() {
            observer.init(tables);
        }
    }

    pub fn begin(&self, table: &Table, estimated_rows: Option<u64>) {
        log::debug!("notify begin: {}", table);
        for observer in self.snapshot() {
            observer.begin(table, estimated_rows);
        }
    }

    pub fn progress(&self, table: &Table, row_delta: u64) {
        for observer in self.snapshot() {
            observer.progress(table, row_delta);
        }
    }

    pub fn success(&self, table: &Table, row_count: u64) {
        log::debug!("notify success: {}", table);
        for observer in self.snapshot() {
            observer.success(table, row_count);
        }
    }

    pub fn failure(&self, table: &Table, cause: &EngineError, rows_processed: u64) {
        log::debug!("notify failure: {}", table);
        for observer in self.snapshot() {
            observer.failure(table, cause, rows_processed);
        }
    }
}

/// Observer that writes every event to the `log` facade
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn init(&self, tables: &[Table]) {
        let names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        log::info!("Analysis of {} table(s) starting: {}", tables.len(), names.join(", "));
    }

    fn begin(&self, table: &Table, estimated_rows: Option<u64>) {
        match estimated_rows {
            Some(rows) => log::info!("Table {}: begin, ~{} rows", table, rows),
            None => log::info!("Table {}: begin", table),
        }
    }

    fn progress(&self, table: &Table, row_delta: u64) {
        log::debug!("Table {}: +{} rows", table, row_delta);
    }

    fn success(&self, table: &Table, row_count: u64) {
        log::info!("Table {}: finished, {} rows processed", table, row_count);
    }

    fn failure(&self, table: &Table, cause: &EngineError, rows_processed: u64) {
        log::error!("Table {}: failed after {} rows: {}", table, rows_processed, cause);
    }
}
