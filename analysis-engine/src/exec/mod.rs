// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Job execution engine
//!
//! This module runs a planned job: one worker per sub-query, admitted into
//! connection slots by the scheduler, feeding rows into a per-table delegate
//! that fans them out to the table's processors.

pub mod connection_slot;
pub mod delegate;
pub mod error;
pub mod processor;
pub mod progress;
pub mod results;
pub mod scheduler;
pub mod worker;

// Re-export the main types for convenience
pub use connection_slot::ConnectionSlot;
pub use delegate::{TableDelegate, TableStatus, PROGRESS_BATCH_THRESHOLD};
pub use error::{EngineError, ProcessingError};
pub use processor::{ComponentFactory, ProcessorResult, RowProcessor};
pub use progress::{LoggingObserver, ObserverHub, ProgressObserver};
pub use results::ResultStore;
pub use scheduler::{JobControl, QueryScheduler, ADMISSION_POLL_INTERVAL};
pub use worker::{QueryWorker, RowSink, StopToken, WorkerState};
