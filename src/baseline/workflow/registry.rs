// SPDX-License-Identifier: MIT

use crate::sdk::probe::Probe;
use crate::sdk::provider::ProviderType;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Probes available to the engine, one per provider
#[derive(Clone)]
pub struct ProbeRegistry {
    probes: Arc<RwLock<HashMap<ProviderType, Arc<dyn Probe>>>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            probes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `probe` for `provider`, replacing any earlier one
    pub async fn register(&self, provider: ProviderType, probe: Arc<dyn Probe>) {
        let mut probes = self.probes.write().await;
        if let Some(previous) = probes.insert(provider.clone(), probe) {
            log::debug!(
                "Replaced probe {} for provider {}",
                previous.name(),
                provider
            );
        }
    }

    /// Register `probe` for every recognized provider
    pub async fn register_all(&self, probe: Arc<dyn Probe>) {
        let mut probes = self.probes.write().await;
        for provider in ProviderType::ALL {
            probes.insert(provider, Arc::clone(&probe));
        }
    }

    pub async fn get(&self, provider: &ProviderType) -> Option<Arc<dyn Probe>> {
        let probes = self.probes.read().await;
        probes.get(provider).cloned()
    }

    /// Providers with a registered probe
    pub async fn providers(&self) -> Vec<ProviderType> {
        let probes = self.probes.read().await;
        let mut providers: Vec<ProviderType> = probes.keys().cloned().collect();
        providers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        providers
    }

    /// Copy of the current mapping, taken once per run
    pub async fn snapshot(&self) -> HashMap<ProviderType, Arc<dyn Probe>> {
        self.probes.read().await.clone()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
