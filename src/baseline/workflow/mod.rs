// SPDX-License-Identifier: MIT

pub mod applicability;
pub mod condition;
pub mod engine;
pub mod graph;
pub mod loader;
pub mod params;
pub mod plan;
pub mod registry;
pub mod results;
pub mod types;
pub mod validator;
