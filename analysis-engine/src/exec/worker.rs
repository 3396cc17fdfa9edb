// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query workers - one thread per sub-query, cooperatively stoppable
//!
//! A worker streams the rows of exactly one query into the row sink of its
//! table. Stopping is cooperative: the stop token is checked before each row
//! is fetched, never in the middle of a row, so neither the row stream nor a
//! processor is ever interrupted halfway.

use crate::datasource::{DataConnection, RowStream};
use crate::exec::error::EngineError;
use crate::exec::scheduler::JobControl;
use crate::model::{Query, Row, Table};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Receiver of the rows streamed by the workers of one table
pub trait RowSink: Send + Sync {
    fn process_row(&self, row: &Row, weight: u64);

    /// Fail the table (no-op once the table reached a terminal state)
    fn fail(&self, cause: EngineError);

    /// Called exactly once per worker; `stopped` is true when the worker
    /// exited because of a stop request rather than an exhausted stream
    fn worker_finished(&self, stopped: bool);
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; returns `true` only for the first request
    pub fn request(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, waiting for a connection slot
    Pending,
    /// Started on its own thread
    Running(ThreadId),
    /// Finished; cleanup has run
    Exited,
}

enum StreamOutcome {
    Exhausted,
    Stopped,
}

/// Closes the row stream however streaming ends, unwinding included
struct StreamGuard {
    stream: Box<dyn RowStream>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.close();
    }
}

pub struct QueryWorker {
    id: usize,
    query: Query,
    sink: Arc<dyn RowSink>,
    stop: StopToken,
    state: Mutex<WorkerState>,
    exited: Condvar,
    rows_streamed: AtomicU64,
}

impl QueryWorker {
    pub fn new(id: usize, query: Query, sink: Arc<dyn RowSink>) -> Self {
        Self {
            id,
            query,
            sink,
            stop: StopToken::new(),
            state: Mutex::new(WorkerState::Pending),
            exited: Condvar::new(),
            rows_streamed: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn table(&self) -> &Table {
        self.query.table()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), WorkerState::Running(_))
    }

    pub fn has_exited(&self) -> bool {
        *self.state.lock() == WorkerState::Exited
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Weighted number of rows forwarded to the sink so far
    pub fn rows_streamed(&self) -> u64 {
        self.rows_streamed.load(Ordering::SeqCst)
    }

    /// Ask the worker to stop at the next row boundary
    ///
    /// With `synchronous`, blocks until a started worker has exited. A worker
    /// that has not been started yet never opens its query once stopped, and
    /// a worker stopping itself does not wait. Repeated calls are no-ops.
    pub fn request_stop(&self, synchronous: bool) {
        if self.stop.request() {
            log::debug!("Worker {} ({}): stop requested", self.id, self.table());
        }
        if !synchronous {
            return;
        }

        let mut state = self.state.lock();
        loop {
            match *state {
                WorkerState::Pending | WorkerState::Exited => return,
                WorkerState::Running(thread_id) if thread_id == thread::current().id() => return,
                WorkerState::Running(_) => self.exited.wait(&mut state),
            }
        }
    }

    /// Block until the worker has exited
    ///
    /// Only meaningful once the worker has been started or abandoned.
    pub fn wait_for_exit(&self) {
        let mut state = self.state.lock();
        while *state != WorkerState::Exited {
            self.exited.wait(&mut state);
        }
    }

    /// Start streaming on a dedicated thread
    pub(crate) fn start(
        self: &Arc<Self>,
        connection: Arc<dyn DataConnection>,
        control: Arc<JobControl>,
    ) {
        // The state lock is held across spawn so the new thread observes Running
        let mut state = self.state.lock();
        if *state != WorkerState::Pending {
            log::warn!("Worker {} started twice; ignoring", self.id);
            return;
        }

        let worker = Arc::clone(self);
        let thread_control = Arc::clone(&control);
        let spawned = thread::Builder::new()
            .name(format!("query-worker-{}", self.id))
            .spawn(move || worker.run(connection, thread_control));

        match spawned {
            Ok(handle) => {
                *state = WorkerState::Running(handle.thread().id());
                log::debug!(
                    "Worker {} ({}): started for query {}",
                    self.id,
                    self.table(),
                    self.query
                );
            }
            Err(error) => {
                drop(state);
                let fatal = EngineError::Fatal(format!("Failed to spawn worker thread: {}", error));
                log::error!("Worker {}: {}", self.id, fatal);
                control.record_fatal(fatal.clone());
                self.sink.fail(fatal);
                self.finish_without_running();
            }
        }
    }

    /// Retire a worker that was never started
    pub(crate) fn abandon(&self) {
        if *self.state.lock() == WorkerState::Pending {
            log::debug!("Worker {} ({}): abandoned before start", self.id, self.table());
            self.stop.request();
            self.finish_without_running();
        }
    }

    fn finish_without_running(&self) {
        self.sink.worker_finished(true);
        self.mark_exited();
    }

    fn run(self: Arc<Self>, connection: Arc<dyn DataConnection>, control: Arc<JobControl>) {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.stream_rows(connection.as_ref())));

        let stopped = match outcome {
            Ok(Ok(StreamOutcome::Exhausted)) => false,
            Ok(Ok(StreamOutcome::Stopped)) => true,
            Ok(Err(error)) => {
                log::error!("Worker {} ({}): query failed: {}", self.id, self.table(), error);
                self.sink.fail(error);
                false
            }
            Err(payload) => {
                self.on_panic(&control, payload.as_ref());
                true
            }
        };

        let finished = panic::catch_unwind(AssertUnwindSafe(|| self.sink.worker_finished(stopped)));
        if let Err(payload) = finished {
            self.on_panic(&control, payload.as_ref());
        }

        log::debug!(
            "Worker {} ({}): exited after {} rows{}",
            self.id,
            self.table(),
            self.rows_streamed(),
            if stopped { " (stopped)" } else { "" }
        );
        self.mark_exited();
        control.signal_release();
    }

    fn stream_rows(&self, connection: &dyn DataConnection) -> Result<StreamOutcome, EngineError> {
        if self.stop.is_stopped() {
            return Ok(StreamOutcome::Stopped);
        }

        let mut guard = StreamGuard {
            stream: connection.execute_query(&self.query)?,
        };

        loop {
            if self.stop.is_stopped() {
                return Ok(StreamOutcome::Stopped);
            }
            match guard.stream.next() {
                None => return Ok(StreamOutcome::Exhausted),
                Some(Ok(row)) => {
                    let weight = self.query.row_weight(&row);
                    self.sink.process_row(&row, weight);
                    self.rows_streamed.fetch_add(weight, Ordering::SeqCst);
                }
                Some(Err(error)) => return Err(error),
            }
        }
    }

    fn on_panic(&self, control: &JobControl, payload: &(dyn Any + Send)) {
        let fatal = EngineError::Fatal(format!(
            "worker {} on table '{}' panicked: {}",
            self.id,
            self.table(),
            panic_message(payload)
        ));
        log::error!("{}", fatal);
        self.sink.fail(fatal.clone());
        control.record_fatal(fatal);
    }

    fn mark_exited(&self) {
        *self.state.lock() = WorkerState::Exited;
        self.exited.notify_all();
    }
}

impl std::fmt::Debug for QueryWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryWorker")
            .field("id", &self.id)
            .field("query", &self.query.to_string())
            .field("state", &self.state())
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
