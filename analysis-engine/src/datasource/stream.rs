// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row streams - lazy, pull-based query results

use crate::exec::error::EngineError;
use crate::model::Row;

/// Stream of rows produced by one executed query
///
/// Rows are pulled one at a time so a worker can stop between rows.
/// `close` releases the underlying cursor; it is called exactly once by the
/// worker, even when streaming ends with an error.
pub trait RowStream: Iterator<Item = Result<Row, EngineError>> + Send {
    /// Get estimated row count if known
    fn size_hint_rows(&self) -> Option<usize> {
        None
    }

    /// Release resources held by the stream
    fn close(&mut self) {}
}

/// Stream over already materialized rows
pub struct VecRowStream {
    rows: std::vec::IntoIter<Row>,
    count: usize,
    closed: bool,
}

impl VecRowStream {
    pub fn new(rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self {
            rows: rows.into_iter(),
            count,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for VecRowStream {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.rows.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl RowStream for VecRowStream {
    fn size_hint_rows(&self) -> Option<usize> {
        Some(self.count)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Stream that yields no rows
pub struct EmptyRowStream;

impl Iterator for EmptyRowStream {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        None
    }
}

impl RowStream for EmptyRowStream {
    fn size_hint_rows(&self) -> Option<usize> {
        Some(0)
    }
}

/// Stream yielding `rows` and then a single error
///
/// Models a cursor that breaks mid-read.
pub struct ErrorRowStream {
    rows: std::vec::IntoIter<Row>,
    error: Option<EngineError>,
}

impl ErrorRowStream {
    pub fn new(error: EngineError) -> Self {
        Self::after_rows(Vec::new(), error)
    }

    pub fn after_rows(rows: Vec<Row>, error: EngineError) -> Self {
        Self {
            rows: rows.into_iter(),
            error: Some(error),
        }
    }
}

impl Iterator for ErrorRowStream {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Some(row) => Some(Ok(row)),
            None => self.error.take().map(Err),
        }
    }
}

impl RowStream for ErrorRowStream {}
