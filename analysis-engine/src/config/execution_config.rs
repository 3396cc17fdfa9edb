// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution configuration and validation

use crate::exec::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling how a job is read from its data source
///
/// All values are validated eagerly: the setters reject zero where a positive
/// number is required, and loaded configurations are validated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfiguration {
    /// Maximum rows per sub-query; `None` disables query splitting
    query_split_size: Option<u64>,

    /// Number of parallel connections (duplicates of the caller's connection)
    max_connections: usize,

    /// Number of concurrent queries a single connection may serve
    max_queries_per_connection: usize,

    /// Rewrite reads into `COUNT(*) ... GROUP BY` queries
    group_by_optimization_enabled: bool,

    /// Allow processors to keep detail queries in their results
    drill_to_detail_enabled: bool,
}

impl Default for ExecutionConfiguration {
    fn default() -> Self {
        Self {
            query_split_size: None,
            max_connections: 1,
            max_queries_per_connection: 1,
            group_by_optimization_enabled: false,
            drill_to_detail_enabled: true,
        }
    }
}

impl ExecutionConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let configuration: Self = serde_json::from_str(json)?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        log::debug!("Loading execution configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every numeric option
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.query_split_size == Some(0) {
            return Err(EngineError::InvalidConfiguration(
                "query_split_size must be positive".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_queries_per_connection == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_queries_per_connection must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_query_split_size(mut self, split_size: Option<u64>) -> Result<Self, EngineError> {
        self.set_query_split_size(split_size)?;
        Ok(self)
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Result<Self, EngineError> {
        self.set_max_connections(max_connections)?;
        Ok(self)
    }

    pub fn with_max_queries_per_connection(
        mut self,
        max_queries: usize,
    ) -> Result<Self, EngineError> {
        self.set_max_queries_per_connection(max_queries)?;
        Ok(self)
    }

    pub fn with_group_by_optimization(mut self, enabled: bool) -> Self {
        self.group_by_optimization_enabled = enabled;
        self
    }

    pub fn with_drill_to_detail(mut self, enabled: bool) -> Self {
        self.drill_to_detail_enabled = enabled;
        self
    }

    pub fn set_query_split_size(&mut self, split_size: Option<u64>) -> Result<(), EngineError> {
        if split_size == Some(0) {
            return Err(EngineError::InvalidConfiguration(
                "query_split_size must be positive".to_string(),
            ));
        }
        self.query_split_size = split_size;
        Ok(())
    }

    pub fn set_max_connections(&mut self, max_connections: usize) -> Result<(), EngineError> {
        if max_connections == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        self.max_connections = max_connections;
        Ok(())
    }

    pub fn set_max_queries_per_connection(
        &mut self,
        max_queries: usize,
    ) -> Result<(), EngineError> {
        if max_queries == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max_queries_per_connection must be at least 1".to_string(),
            ));
        }
        self.max_queries_per_connection = max_queries;
        Ok(())
    }

    pub fn set_group_by_optimization_enabled(&mut self, enabled: bool) {
        self.group_by_optimization_enabled = enabled;
    }

    pub fn set_drill_to_detail_enabled(&mut self, enabled: bool) {
        self.drill_to_detail_enabled = enabled;
    }

    pub fn query_split_size(&self) -> Option<u64> {
        self.query_split_size
    }

    pub fn is_query_splitter_enabled(&self) -> bool {
        self.query_split_size.is_some()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn max_queries_per_connection(&self) -> usize {
        self.max_queries_per_connection
    }

    pub fn is_group_by_optimization_enabled(&self) -> bool {
        self.group_by_optimization_enabled
    }

    pub fn is_drill_to_detail_enabled(&self) -> bool {
        self.drill_to_detail_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfiguration::default();
        assert_eq!(config.query_split_size(), None);
        assert!(!config.is_query_splitter_enabled());
        assert_eq!(config.max_connections(), 1);
        assert_eq!(config.max_queries_per_connection(), 1);
        assert!(!config.is_group_by_optimization_enabled());
        assert!(config.is_drill_to_detail_enabled());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            ExecutionConfiguration::new().with_max_connections(0),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ExecutionConfiguration::new().with_max_queries_per_connection(0),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ExecutionConfiguration::new().with_query_split_size(Some(0)),
            Err(EngineError::InvalidConfiguration(_))
        ));

        let mut config = ExecutionConfiguration::new();
        assert!(config.set_max_connections(0).is_err());
        assert_eq!(config.max_connections(), 1);
    }

    #[test]
    fn test_json_partial_document_uses_defaults() {
        let config = ExecutionConfiguration::from_json_str(
            r#"{ "max_connections": 4, "group_by_optimization_enabled": true }"#,
        )
        .unwrap();

        assert_eq!(config.max_connections(), 4);
        assert_eq!(config.max_queries_per_connection(), 1);
        assert!(config.is_group_by_optimization_enabled());
        assert!(config.is_drill_to_detail_enabled());
    }

    #[test]
    fn test_json_invalid_values_rejected() {
        let result =
            ExecutionConfiguration::from_json_str(r#"{ "max_queries_per_connection": 0 }"#);
        assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));

        let result = ExecutionConfiguration::from_json_str("not json");
        assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution.json");

        let config = ExecutionConfiguration::new()
            .with_query_split_size(Some(800))
            .unwrap()
            .with_max_connections(2)
            .unwrap()
            .with_drill_to_detail(false);
        std::fs::write(&path, config.to_json_string().unwrap()).unwrap();

        let loaded = ExecutionConfiguration::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ExecutionConfiguration::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
    }
}
