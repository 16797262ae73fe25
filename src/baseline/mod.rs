// SPDX-License-Identifier: MIT

//! Compliance workflow engine
//!
//! `workflow` validates and runs workflow documents; `probes` holds the probe
//! implementations shipped with the crate.

pub mod probes;
pub mod workflow;
