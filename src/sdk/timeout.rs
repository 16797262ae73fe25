// SPDX-License-Identifier: MIT

//! Timeout durations as written in workflow documents
//!
//! Accepted forms: a number of seconds (`30`, `0.5`), a suffixed string
//! (`"250ms"`, `"30s"`, `"5m"`, `"1h"`, down to `"us"` and `"ns"`) or a clock
//! string (`"00:01:30"`). Timeouts serialize in the coarsest unit that keeps
//! every nanosecond.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

static SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(ns|us|ms|s|m|h)$").expect("valid suffix regex"));

static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):([0-5]\d):([0-5]\d(?:\.\d+)?)$").expect("valid clock regex"));

/// A probe timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout(Duration);

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn from_secs_f64(secs: f64) -> Result<Self, String> {
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|e| format!("invalid timeout: {} seconds ({})", secs, e))
    }

    /// Whole amounts are converted exactly; only fractions go through `f64`
    fn from_amount(amount: &str, unit: &str) -> Result<Self, String> {
        if let Ok(whole) = amount.parse::<u64>() {
            let duration = match unit {
                "ns" => Some(Duration::from_nanos(whole)),
                "us" => Some(Duration::from_micros(whole)),
                "ms" => Some(Duration::from_millis(whole)),
                "s" => Some(Duration::from_secs(whole)),
                "m" => whole.checked_mul(60).map(Duration::from_secs),
                _ => whole.checked_mul(3600).map(Duration::from_secs),
            };
            return duration
                .map(Self)
                .ok_or_else(|| format!("invalid timeout: {}{} is too large", amount, unit));
        }

        let amount: f64 = amount
            .parse()
            .map_err(|_| format!("invalid timeout: {}{}", amount, unit))?;
        let secs = match unit {
            "ns" => amount / 1e9,
            "us" => amount / 1e6,
            "ms" => amount / 1e3,
            "s" => amount,
            "m" => amount * 60.0,
            _ => amount * 3600.0,
        };
        Self::from_secs_f64(secs)
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl FromStr for Timeout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(secs) = s.parse::<f64>() {
            return Self::from_secs_f64(secs);
        }

        if let Some(caps) = SUFFIXED.captures(s) {
            return Self::from_amount(&caps[1], &caps[2]);
        }

        if let Some(caps) = CLOCK.captures(s) {
            let hours: f64 = caps[1]
                .parse()
                .map_err(|_| format!("invalid timeout: {}", s))?;
            let minutes: f64 = caps[2]
                .parse()
                .map_err(|_| format!("invalid timeout: {}", s))?;
            let seconds: f64 = caps[3]
                .parse()
                .map_err(|_| format!("invalid timeout: {}", s))?;
            return Self::from_secs_f64(hours * 3600.0 + minutes * 60.0 + seconds);
        }

        Err(format!(
            "invalid timeout '{}': expected seconds, '<n>ns|us|ms|s|m|h' or 'HH:MM:SS'",
            s
        ))
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.subsec_nanos();
        if nanos == 0 {
            write!(f, "{}s", self.0.as_secs())
        } else if nanos % 1_000_000 == 0 {
            write!(f, "{}ms", self.0.as_millis())
        } else if nanos % 1_000 == 0 {
            write!(f, "{}us", self.0.as_micros())
        } else {
            write!(f, "{}ns", self.0.as_nanos())
        }
    }
}

impl Serialize for Timeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct TimeoutVisitor;

impl<'de> Visitor<'de> for TimeoutVisitor {
    type Value = Timeout;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number of seconds or a duration string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timeout, E> {
        Ok(Timeout::from_secs(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timeout, E> {
        u64::try_from(v)
            .map(Timeout::from_secs)
            .map_err(|_| E::custom(format!("invalid timeout: {} seconds", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timeout, E> {
        Timeout::from_secs_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timeout, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Timeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimeoutVisitor)
    }
}

impl schemars::JsonSchema for Timeout {
    fn schema_name() -> String {
        "Timeout".to_string()
    }

    fn json_schema(_gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        use schemars::schema::{InstanceType, SchemaObject, SingleOrVec};

        SchemaObject {
            instance_type: Some(SingleOrVec::Vec(vec![
                InstanceType::Number,
                InstanceType::String,
            ])),
            ..Default::default()
        }
        .into()
    }
}
