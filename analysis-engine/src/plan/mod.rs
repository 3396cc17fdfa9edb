// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Job planning and query optimization
//!
//! Converts the submitted configurations into a per-table plan: which
//! columns to read, which configurations consume them, and the sub-queries
//! that together cover the table.

pub mod optimizer;
pub mod planner;

pub use optimizer::{DefaultQueryOptimizer, QueryOptimizer, QueryPlan};
pub use planner::{ConfigurationAssignment, JobPlan, JobPlanner, TableAssignment, TablePlan};
