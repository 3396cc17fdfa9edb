// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Job orchestration

pub mod analysis_runner;

pub use analysis_runner::AnalysisRunner;
