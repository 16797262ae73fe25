// SPDX-License-Identifier: MIT

pub mod fixture;

pub use fixture::{FixtureAnswer, FixtureProbe};
