// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection slots - admission control per logical connection

use crate::datasource::DataConnection;
use crate::exec::scheduler::JobControl;
use crate::exec::worker::QueryWorker;
use parking_lot::Mutex;
use std::sync::Arc;

/// Authorizes at most `max_queries` concurrent workers on one connection
pub struct ConnectionSlot {
    index: usize,
    connection: Arc<dyn DataConnection>,
    max_queries: usize,
    workers: Mutex<Vec<Arc<QueryWorker>>>,
}

impl ConnectionSlot {
    pub fn new(index: usize, connection: Arc<dyn DataConnection>, max_queries: usize) -> Self {
        Self {
            index,
            connection,
            max_queries: max_queries.max(1),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_queries(&self) -> usize {
        self.max_queries
    }

    /// Start `worker` on this slot's connection if there is capacity
    ///
    /// Workers that are no longer running are reclaimed first.
    pub(crate) fn try_acquire(&self, worker: &Arc<QueryWorker>, control: &Arc<JobControl>) -> bool {
        let mut workers = self.workers.lock();
        workers.retain(|tracked| !tracked.has_exited());

        if workers.len() >= self.max_queries {
            return false;
        }

        log::debug!(
            "Slot {}: admitting worker {} ({} of {} in use)",
            self.index,
            worker.id(),
            workers.len() + 1,
            self.max_queries
        );
        workers.push(Arc::clone(worker));
        worker.start(Arc::clone(&self.connection), Arc::clone(control));
        true
    }

    /// Number of tracked workers that have not exited yet
    pub fn running_count(&self) -> usize {
        self.workers.lock().iter().filter(|worker| !worker.has_exited()).count()
    }
}

impl std::fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("index", &self.index)
            .field("max_queries", &self.max_queries)
            .field("running", &self.running_count())
            .finish()
    }
}
