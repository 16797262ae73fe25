// SPDX-License-Identifier: MIT

//! Condition evaluation for rules
//!
//! A condition pairs an operator with an expected value:
//! - `Equals` / `NotEquals` - normalized equality
//! - `GreaterThan` / `LessThan` - numeric ordering (f64)
//! - `Contains` / `NotContains` - substring or membership
//! - `RegexMatch` - full-string match
//! - `Exists` / `NotExists` - whether the probe saw anything

mod evaluator;
mod operator;

pub use evaluator::{evaluate, CompiledCondition, Evaluation};
pub use operator::Operator;
