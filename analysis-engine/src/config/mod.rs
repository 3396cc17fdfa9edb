// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Job and execution configuration

pub mod execution_config;
pub mod job_config;

pub use execution_config::ExecutionConfiguration;
pub use job_config::JobConfiguration;
