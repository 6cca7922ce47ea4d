//! Model Catalog: model id → display name, provider and ordered fallbacks.

use std::collections::HashMap;

use crate::config::ModelConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: HashMap<String, ModelConfig>,
    /// Configuration order, for listings
    order: Vec<String>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelConfig>) -> Result<Self, ConfigError> {
        let mut catalog = Self::default();
        for model in models {
            if model.id.trim().is_empty() {
                return Err(ConfigError::MissingModelId);
            }
            if catalog.models.contains_key(&model.id) {
                return Err(ConfigError::DuplicateModel(model.id));
            }
            catalog.order.push(model.id.clone());
            catalog.models.insert(model.id.clone(), model);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }

    /// Candidate ids for a dispatch: the model itself, then its fallbacks in
    /// configured order. Repeats are kept; the list is exactly as long as configured.
    pub fn candidates(&self, id: &str) -> Option<Vec<String>> {
        let model = self.models.get(id)?;
        let mut candidates = Vec::with_capacity(1 + model.fallback.len());
        candidates.push(model.id.clone());
        candidates.extend(model.fallback.iter().cloned());
        Some(candidates)
    }

    /// Models in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.order.iter().filter_map(|id| self.models.get(id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
