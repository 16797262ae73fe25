// SPDX-License-Identifier: MIT

//! Host applicability constraints
//!
//! A workflow may restrict the OS family, version range and products it is
//! written for. Versions are compared segment by segment as numbers
//! (`10.0.19045` > `10.0.9200`); non-numeric segments compare as text.

use crate::sdk::config::HostProfile;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Applicability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_family: Option<String>,
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
    /// Any-of; empty means every product
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

impl Applicability {
    /// Whether no constraint is set
    pub fn is_unconstrained(&self) -> bool {
        self == &Applicability::default()
    }

    /// Check the host against every constraint; `Err` carries the first mismatch
    pub fn check(&self, host: &HostProfile) -> Result<(), String> {
        if let Some(family) = &self.os_family {
            if !family.eq_ignore_ascii_case(&host.os_family) {
                return Err(format!(
                    "requires OS family {}, host is {}",
                    family, host.os_family
                ));
            }
        }

        if let Some(min) = &self.min_version {
            if compare_versions(&host.version, min) == Ordering::Less {
                return Err(format!(
                    "requires version >= {}, host is {}",
                    min, host.version
                ));
            }
        }

        if let Some(max) = &self.max_version {
            if compare_versions(&host.version, max) == Ordering::Greater {
                return Err(format!(
                    "requires version <= {}, host is {}",
                    max, host.version
                ));
            }
        }

        if !self.products.is_empty() {
            let matched = host.product.as_ref().is_some_and(|product| {
                self.products
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(product))
            });
            if !matched {
                return Err(format!(
                    "requires one of products [{}], host is {}",
                    self.products.join(", "),
                    host.product.as_deref().unwrap_or("unspecified")
                ));
            }
        }

        Ok(())
    }
}

/// Compare dotted versions; missing trailing segments count as zero
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let l: Vec<&str> = left.trim().split('.').collect();
    let r: Vec<&str> = right.trim().split('.').collect();

    for i in 0..l.len().max(r.len()) {
        let a = l.get(i).copied().unwrap_or("0");
        let b = r.get(i).copied().unwrap_or("0");
        let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
