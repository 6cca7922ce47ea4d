//! Dispatcher
//!
//! Resolves a request's model to a provider and walks the configured fallback
//! chain until one candidate succeeds:
//!
//! 1. Unknown primary model → `ModelNotFound`, no provider is called.
//! 2. Candidates are `[model, ...fallbacks]` in configured order, repeats kept.
//! 3. Each candidate is tried once; unresolvable models/providers are skipped,
//!    provider errors are logged and the walk continues.
//! 4. The first success records usage and is returned unchanged.
//! 5. Nothing left → `Exhausted`.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::ModelCatalog;
use crate::error::GatewayError;
use crate::models::{ChatCompletionRequest, ChatCompletionResponse};
use crate::registry::ProviderRegistry;
use crate::usage::UsageCollector;

pub struct Dispatcher {
    catalog: Arc<ModelCatalog>,
    registry: Arc<ProviderRegistry>,
    usage: Arc<dyn UsageCollector>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        registry: Arc<ProviderRegistry>,
        usage: Arc<dyn UsageCollector>,
    ) -> Self {
        Self {
            catalog,
            registry,
            usage,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Dispatch `request` through its model's fallback chain.
    ///
    /// Once `cancel` fires no new candidate is started and the in-flight
    /// provider call is dropped.
    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        let candidates = self
            .catalog
            .candidates(&request.model)
            .ok_or_else(|| GatewayError::ModelNotFound(request.model.clone()))?;

        for (idx, model_id) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(model = %request.model, "Dispatch cancelled before next candidate");
                return Err(GatewayError::Cancelled);
            }

            let Some(model) = self.catalog.get(model_id) else {
                warn!(model = %model_id, "Fallback model not found in config");
                continue;
            };

            let provider_id = model.provider.as_str();
            let Some(provider) = self.registry.get(provider_id) else {
                warn!(model = %model_id, provider = %provider_id, "Provider not found for model");
                continue;
            };

            info!(
                model = %model.name,
                provider = %provider_id,
                attempt = idx + 1,
                "Sending request to provider"
            );
            let attempt = request.with_model(model.name.as_str());

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(model = %model.name, provider = %provider_id, "Dispatch cancelled during provider call");
                    return Err(GatewayError::Cancelled);
                }
                result = provider.chat_completion(&attempt) => result,
            };

            match result {
                Ok(response) => {
                    if idx > 0 {
                        info!(
                            requested = %request.model,
                            model = %model_id,
                            provider = %provider_id,
                            "Request succeeded on fallback"
                        );
                    }
                    self.usage
                        .record(&response.model, provider_id, &response.usage);
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        error = %e,
                        status = ?e.status(),
                        model = %model.name,
                        provider = %provider_id,
                        "Provider chat completion failed"
                    );
                }
            }
        }

        Err(GatewayError::Exhausted)
    }
}
