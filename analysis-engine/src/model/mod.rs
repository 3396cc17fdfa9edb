// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data model shared by the planner, the data sources and the execution engine
//!
//! - `Table` / `Column`: physical schema identities (tables are the partition key
//!   for aggregation and failure isolation)
//! - `Value` / `Row` / `SelectItem`: streamed records
//! - `Query`: engine-agnostic read request handed to a data connection

pub mod query;
pub mod row;
pub mod table;
pub mod value;

pub use query::Query;
pub use row::{Row, SelectItem};
pub use table::{Column, Table};
pub use value::Value;
