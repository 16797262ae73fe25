// SPDX-License-Identifier: MIT

//! Host-facing contract of the engine
//!
//! This module provides the pieces a hosting system plugs into:
//! - `Probe` - the per-provider capability that observes the OS
//! - `ProviderParameters` - typed parameter shapes handed to probes
//! - `Clock` - injected time source for timestamps
//! - `EngineConfig` - runtime tuning and the host profile

pub mod clock;
pub mod config;
pub mod error;
pub mod probe;
pub mod provider;
pub mod timeout;
pub mod value;
