// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query scheduler - admits workers into connection slots
//!
//! The scheduler owns `min(workers, max_connections)` connection slots and
//! admits pending workers greedily into the first slot with capacity. When
//! every slot is full it waits for a worker to exit (or for the poll interval
//! to elapse) and scans again.
//!
//! It also owns the job-wide fatal error: the first worker that panics records
//! it, and every worker of every table is asked to stop.

use crate::config::ExecutionConfiguration;
use crate::datasource::DataConnection;
use crate::exec::connection_slot::ConnectionSlot;
use crate::exec::error::EngineError;
use crate::exec::worker::QueryWorker;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long admission waits before rescanning the slots
pub const ADMISSION_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// State shared between the scheduler and its running workers
pub struct JobControl {
    workers: Vec<Arc<QueryWorker>>,
    fatal: OnceCell<EngineError>,
    stopping: AtomicBool,
    release_generation: Mutex<u64>,
    released: Condvar,
}

impl JobControl {
    pub(crate) fn new(workers: Vec<Arc<QueryWorker>>) -> Arc<Self> {
        Arc::new(Self {
            workers,
            fatal: OnceCell::new(),
            stopping: AtomicBool::new(false),
            release_generation: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Record the job's fatal error and stop everything
    ///
    /// Only the first error is kept; later calls still request the stop.
    pub(crate) fn record_fatal(&self, error: EngineError) {
        if self.fatal.set(error).is_ok() {
            log::error!("Fatal error recorded, stopping all workers");
        }
        self.stop_all();
    }

    pub fn fatal_error(&self) -> Option<EngineError> {
        self.fatal.get().cloned()
    }

    /// Ask every worker of every table to stop at its next row boundary
    pub(crate) fn stop_all(&self) {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            log::info!("Stopping {} workers", self.workers.len());
        }
        for worker in &self.workers {
            worker.request_stop(false);
        }
        self.signal_release();
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn release_generation(&self) -> u64 {
        *self.release_generation.lock()
    }

    /// Wake the admission loop; called whenever slot capacity may have freed up
    pub(crate) fn signal_release(&self) {
        *self.release_generation.lock() += 1;
        self.released.notify_all();
    }

    /// Wait until the generation moves past `seen`, at most `timeout`
    pub(crate) fn wait_for_release(&self, seen: u64, timeout: Duration) {
        let mut generation = self.release_generation.lock();
        if *generation == seen {
            self.released.wait_for(&mut generation, timeout);
        }
    }
}

/// Admission control for the workers of one job
pub struct QueryScheduler {
    slots: Vec<ConnectionSlot>,
    workers: Vec<Arc<QueryWorker>>,
    control: Arc<JobControl>,
}

impl QueryScheduler {
    /// Create the connection slots for `workers`
    ///
    /// The first slot reuses `connection`, the others use duplicates of it.
    /// A failed duplication is returned immediately.
    pub fn new(
        connection: Arc<dyn DataConnection>,
        workers: Vec<Arc<QueryWorker>>,
        execution: &ExecutionConfiguration,
    ) -> Result<Self, EngineError> {
        let slot_count = workers.len().min(execution.max_connections());
        let mut slots = Vec::with_capacity(slot_count);

        for index in 0..slot_count {
            let slot_connection = if index == 0 {
                Arc::clone(&connection)
            } else {
                connection.duplicate().map_err(|error| match error {
                    EngineError::ConnectionDuplication(_) => error,
                    other => EngineError::ConnectionDuplication(other.to_string()),
                })?
            };
            slots.push(ConnectionSlot::new(
                index,
                slot_connection,
                execution.max_queries_per_connection(),
            ));
        }

        log::info!(
            "Scheduler: {} workers, {} connection slots, {} queries per connection",
            workers.len(),
            slots.len(),
            execution.max_queries_per_connection()
        );

        let control = JobControl::new(workers.clone());
        Ok(Self {
            slots,
            workers,
            control,
        })
    }

    pub fn slots(&self) -> &[ConnectionSlot] {
        &self.slots
    }

    pub fn workers(&self) -> &[Arc<QueryWorker>] {
        &self.workers
    }

    /// Admit every worker, blocking while all slots are full
    ///
    /// Workers that were asked to stop before admission, or all remaining
    /// workers once the job is stopping, are retired without running.
    pub fn run_admission(&self) {
        for worker in &self.workers {
            loop {
                if self.control.is_stopping() || worker.is_stop_requested() {
                    worker.abandon();
                    break;
                }

                let seen = self.control.release_generation();
                if self
                    .slots
                    .iter()
                    .any(|slot| slot.try_acquire(worker, &self.control))
                {
                    break;
                }
                self.control.wait_for_release(seen, ADMISSION_POLL_INTERVAL);
            }
        }
        log::debug!("Scheduler: all {} workers admitted", self.workers.len());
    }

    /// Block until every worker has exited
    ///
    /// Call after `run_admission` has returned.
    pub fn wait_for_completion(&self) {
        for worker in &self.workers {
            worker.wait_for_exit();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.workers.iter().all(|worker| worker.has_exited())
    }

    /// Stop every worker of every table
    pub fn stop_all(&self) {
        self.control.stop_all();
    }

    pub fn fatal_error(&self) -> Option<EngineError> {
        self.control.fatal_error()
    }

    /// Record a job-wide fatal error raised outside the workers
    pub(crate) fn record_fatal(&self, error: EngineError) {
        self.control.record_fatal(error);
    }

    pub fn is_stopping(&self) -> bool {
        self.control.is_stopping()
    }

    /// Workers currently running across all slots
    pub fn running_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.running_count()).sum()
    }
}
