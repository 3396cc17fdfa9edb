// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use thiserror::Error;

/// Engine errors
///
/// `Query`, `Processing` and `Cancelled` are table-scoped: they fail a single
/// table and are reported through `ProgressObserver::failure`. `Fatal` is
/// job-wide and is returned to the caller of a synchronous execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Connection duplication failed: {0}")]
    ConnectionDuplication(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Processing error in '{descriptor}': {message}")]
    Processing { descriptor: String, message: String },

    #[error("Execution cancelled: {0}")]
    Cancelled(String),

    #[error("Fatal error: {0}")]
    Fatal(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// Whether this error only affects the table it was raised for
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::Query(_) | EngineError::Processing { .. } | EngineError::Cancelled(_)
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::InvalidConfiguration(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::InvalidConfiguration(error.to_string())
    }
}

/// Error returned by a processor that cannot consume a row
///
/// Fails the processor's table; other tables keep running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessingError {
    message: String,
}

impl ProcessingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProcessingError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ProcessingError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
