// SPDX-License-Identifier: MIT

//! Dependency graph construction and execution
//!
//! This module builds the rule dependency graph, chains the sequential lane
//! and provides the scheduler that runs rules in graph order.

pub mod executor;
mod normalizer;
pub mod types;

pub use executor::Scheduler;
pub use types::{DependencyGraph, NodeSpec};
