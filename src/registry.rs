//! Provider Registry
//!
//! One adapter per configured provider, constructed eagerly at startup. Any
//! invalid provider definition fails construction of the whole registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};
use crate::dummy::DummyProvider;
use crate::error::ConfigError;
use crate::openai_compatible::OpenAiCompatibleProvider;
use crate::provider::ChatProvider;

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish()
    }
}

/// Construct the adapter variant for a provider definition
pub fn build_provider(cfg: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, ConfigError> {
    match cfg.provider {
        ProviderKind::Dummy => Ok(Arc::new(DummyProvider::new(cfg.config.latency_ms))),
        ProviderKind::Openai | ProviderKind::OpenaiCompatible | ProviderKind::Ollama => {
            Ok(Arc::new(OpenAiCompatibleProvider::from_config(cfg)?))
        }
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &[ProviderConfig]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for cfg in configs {
            if cfg.id.trim().is_empty() {
                return Err(ConfigError::MissingProviderId);
            }
            if registry.providers.contains_key(&cfg.id) {
                return Err(ConfigError::DuplicateProvider(cfg.id.clone()));
            }
            let provider = build_provider(cfg)?;
            tracing::info!(provider = %cfg.id, kind = %cfg.provider, "Registered provider");
            registry.providers.insert(cfg.id.clone(), provider);
        }
        Ok(registry)
    }

    /// Register a prebuilt adapter under `id`, replacing any previous one
    pub fn with_provider(mut self, id: impl Into<String>, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(id.into(), provider);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
