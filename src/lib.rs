// SPDX-License-Identifier: MIT

//! Declarative compliance workflows: validation, dependency ordering and
//! probe-driven rule evaluation.

pub mod baseline;
pub mod sdk;
