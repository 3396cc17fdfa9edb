// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Table delegates - per-table row fan-out and result aggregation
//!
//! Every table of a job gets one delegate. All workers reading that table
//! push their rows into it; the delegate counts rows under the table lock,
//! hands each row to every processor under that processor's own lock, and
//! publishes the processors' results once the last sub-query has finished.
//!
//! Observers are notified under a separate per-table notification lock, so
//! notifications for one table stay ordered while its status remains
//! readable from inside any observer callback.
//!
//! A delegate ends in exactly one terminal state:
//! - `Succeeded`: all sub-queries finished, results published, `success` sent
//! - `Failed`: a processor, the row stream or a job-wide stop ended the table
//!   early; `failure` sent, the table's remaining workers asked to stop

use crate::config::JobConfiguration;
use crate::exec::error::EngineError;
use crate::exec::processor::{ProcessorResult, RowProcessor};
use crate::exec::progress::ObserverHub;
use crate::exec::results::ResultStore;
use crate::exec::worker::{QueryWorker, RowSink};
use crate::model::{Column, Row, Table};
use parking_lot::Mutex;
use std::sync::Arc;

/// Pending row weight flushed into a progress notification once it exceeds this
pub const PROGRESS_BATCH_THRESHOLD: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Running,
    Succeeded,
    Failed,
}

impl TableStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TableStatus::Running)
    }
}

/// Mutable bookkeeping of one table, guarded by the table lock
struct TableState {
    status: TableStatus,
    query_count: usize,
    finished_queries: usize,
    row_count: u64,
    pending_rows: u64,
    workers: Vec<Arc<QueryWorker>>,
    failure: Option<EngineError>,
}

/// A processor instance and the configuration it was created from
struct ProcessorSlot<R> {
    configuration: Arc<JobConfiguration>,
    columns: Vec<Column>,
    processor: Mutex<Option<Box<dyn RowProcessor<R>>>>,
}

pub struct TableDelegate<R> {
    table: Table,
    processors: Vec<ProcessorSlot<R>>,
    /// Serializes state transitions with their notifications; always taken
    /// before `state`, never by status readers
    notify: Mutex<()>,
    state: Mutex<TableState>,
    hub: Arc<ObserverHub>,
    results: Arc<ResultStore<R>>,
}

impl<R: Send + Sync + 'static> TableDelegate<R> {
    pub fn new(
        table: Table,
        processors: Vec<(Arc<JobConfiguration>, Vec<Column>, Box<dyn RowProcessor<R>>)>,
        hub: Arc<ObserverHub>,
        results: Arc<ResultStore<R>>,
    ) -> Self {
        let processors = processors
            .into_iter()
            .map(|(configuration, columns, processor)| ProcessorSlot {
                configuration,
                columns,
                processor: Mutex::new(Some(processor)),
            })
            .collect();

        Self {
            table,
            processors,
            notify: Mutex::new(()),
            state: Mutex::new(TableState {
                status: TableStatus::Running,
                query_count: 0,
                finished_queries: 0,
                row_count: 0,
                pending_rows: 0,
                workers: Vec::new(),
                failure: None,
            }),
            hub,
            results,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Attach the workers that read this table; one per sub-query
    pub fn register_workers(&self, workers: Vec<Arc<QueryWorker>>) {
        let mut state = self.state.lock();
        state.query_count = workers.len();
        state.workers = workers;
    }

    /// Succeed right away when the table has no sub-queries at all
    pub fn complete_if_idle(&self) {
        let _notify = self.notify.lock();
        {
            let state = self.state.lock();
            if state.status != TableStatus::Running || state.query_count != 0 {
                return;
            }
        }
        log::debug!("Table {}: no sub-queries, completing immediately", self.table);
        self.succeed();
    }

    pub fn status(&self) -> TableStatus {
        self.state.lock().status
    }

    /// Rows counted so far, un-flushed rows included
    pub fn row_count(&self) -> u64 {
        let state = self.state.lock();
        state.row_count + state.pending_rows
    }

    pub fn failure(&self) -> Option<EngineError> {
        self.state.lock().failure.clone()
    }

    pub fn finished_queries(&self) -> usize {
        self.state.lock().finished_queries
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().query_count
    }

    /// Consume the processors and publish their results
    ///
    /// Caller holds the notification lock. A panic in `into_result` leaves
    /// the table running so it can still be failed.
    fn succeed(&self) {
        let results: Vec<ProcessorResult<R>> = self
            .processors
            .iter()
            .filter_map(|slot| {
                let processor = slot.processor.lock().take()?;
                Some(ProcessorResult {
                    configuration: Arc::clone(&slot.configuration),
                    columns: slot.columns.clone(),
                    result: processor.into_result(),
                })
            })
            .collect();

        let row_count = {
            let mut state = self.state.lock();
            state.row_count += std::mem::take(&mut state.pending_rows);
            state.status = TableStatus::Succeeded;
            state.workers.clear();
            state.row_count
        };

        log::info!(
            "Table {}: finished, {} rows processed, {} results",
            self.table,
            row_count,
            results.len()
        );
        self.results.publish(&self.table, results);
        self.hub.success(&self.table, row_count);
    }
}

impl<R: Send + Sync + 'static> RowSink for TableDelegate<R> {
    fn process_row(&self, row: &Row, weight: u64) {
        {
            let _notify = self.notify.lock();
            let flushed = {
                let mut state = self.state.lock();
                if state.status != TableStatus::Running {
                    return;
                }
                state.pending_rows += weight;
                if state.pending_rows > PROGRESS_BATCH_THRESHOLD {
                    let delta = std::mem::take(&mut state.pending_rows);
                    state.row_count += delta;
                    Some((delta, state.row_count))
                } else {
                    None
                }
            };

            if let Some((delta, total)) = flushed {
                log::debug!("Table {}: {} rows processed", self.table, total);
                self.hub.progress(&self.table, delta);
            }
        }

        for slot in &self.processors {
            let outcome = match slot.processor.lock().as_mut() {
                Some(processor) => processor.process(row, weight),
                None => Ok(()),
            };

            if let Err(error) = outcome {
                log::error!(
                    "Table {}: processor '{}' failed on row [{}] (weight {}): {}",
                    self.table,
                    slot.configuration.descriptor(),
                    row,
                    weight,
                    error
                );
                self.fail(EngineError::Processing {
                    descriptor: slot.configuration.descriptor().to_string(),
                    message: error.to_string(),
                });
                return;
            }
        }
    }

    fn fail(&self, cause: EngineError) {
        let workers = {
            let _notify = self.notify.lock();
            let (row_count, workers) = {
                let mut state = self.state.lock();
                if state.status != TableStatus::Running {
                    return;
                }
                state.status = TableStatus::Failed;
                state.row_count += std::mem::take(&mut state.pending_rows);
                state.failure = Some(cause.clone());
                (state.row_count, std::mem::take(&mut state.workers))
            };

            log::error!("Table {}: failed after {} rows: {}", self.table, row_count, cause);
            self.hub.failure(&self.table, &cause, row_count);
            workers
        };

        for worker in workers {
            worker.request_stop(false);
        }
    }

    fn worker_finished(&self, stopped: bool) {
        if stopped {
            self.fail(EngineError::Cancelled(format!(
                "execution of table '{}' was stopped before all of its queries completed",
                self.table
            )));
            return;
        }

        let _notify = self.notify.lock();
        let complete = {
            let mut state = self.state.lock();
            if state.status != TableStatus::Running {
                return;
            }
            state.finished_queries += 1;
            log::debug!(
                "Table {}: {} of {} sub-queries finished",
                self.table,
                state.finished_queries,
                state.query_count
            );
            state.finished_queries >= state.query_count
        };

        if complete {
            self.succeed();
        }
    }
}

impl<R> std::fmt::Debug for TableDelegate<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TableDelegate")
            .field("table", &self.table)
            .field("status", &state.status)
            .field("finished_queries", &state.finished_queries)
            .field("query_count", &state.query_count)
            .field("row_count", &state.row_count)
            .finish()
    }
}
