//! HTTP-JSON adapter for any upstream that speaks the OpenAI Chat Completions
//! protocol (OpenAI itself, vLLM, Ollama, LocalAI, ...).

use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ConfigError;
use crate::models::{ChatCompletionRequest, ChatCompletionResponse};
use crate::provider::{ChatProvider, ProviderError};
use crate::util::http_client_builder_from_env;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub struct OpenAiCompatibleProvider {
    id: String,
    kind: ProviderKind,
    endpoint: String,
    api_key: Option<String>,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    /// Build the adapter from its provider definition.
    ///
    /// Fails when the kind requires a key and none resolves, when no base URL
    /// resolves, or when the URL does not parse.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = require_credential(cfg, cfg.resolve_api_key())?;

        let base_url = cfg
            .resolve_api_url()
            .ok_or_else(|| ConfigError::MissingSetting {
                provider: cfg.id.clone(),
                setting: "api_url".to_string(),
            })?;
        url::Url::parse(&base_url).map_err(|e| ConfigError::InvalidUrl {
            provider: cfg.id.clone(),
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = http_client_builder_from_env();
        if let Some(secs) = cfg.config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|source| ConfigError::HttpClient {
            provider: cfg.id.clone(),
            source,
        })?;

        Ok(Self {
            id: cfg.id.clone(),
            kind: cfg.provider,
            endpoint: chat_completions_url(&base_url),
            api_key,
            org_id: cfg.resolve_org_id(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `openai` refuses to start without a key; self-hosted kinds may run open.
fn require_credential(
    cfg: &ProviderConfig,
    api_key: Option<String>,
) -> Result<Option<String>, ConfigError> {
    if cfg.provider != ProviderKind::Openai || api_key.is_some() {
        return Ok(api_key);
    }
    let hint = match &cfg.config.api_key_env {
        Some(var) => format!("set api_key or {var}"),
        None => "set api_key, api_key_env or OPENAI_API_KEY".to_string(),
    };
    Err(ConfigError::MissingCredential {
        provider: cfg.id.clone(),
        hint,
    })
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH)
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let body =
            serde_json::to_vec(request).map_err(|e| ProviderError::Encode(e.to_string()))?;

        let mut rb = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .body(body);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        if let Some(org) = &self.org_id {
            rb = rb.header("OpenAI-Organization", org);
        }

        let response = rb
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{}: {}", self.id, e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("{}: {}", self.id, e)))?;

        if status != 200 {
            return Err(ProviderError::Status { status, body: text });
        }

        serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| ProviderError::Decode {
            status,
            body: text,
            message: e.to_string(),
        })
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;

    fn provider(kind: ProviderKind, settings: ProviderSettings) -> ProviderConfig {
        ProviderConfig {
            id: "test".into(),
            provider: kind,
            config: settings,
        }
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            chat_completions_url("http://localhost:8000/"),
            "http://localhost:8000/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn openai_without_key_fails_fast() {
        let cfg = provider(
            ProviderKind::Openai,
            ProviderSettings {
                api_key_env: Some("LLM_GATEWAY_TEST_UNSET_OPENAI_KEY".into()),
                ..Default::default()
            },
        );
        let err = require_credential(&cfg, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains("LLM_GATEWAY_TEST_UNSET_OPENAI_KEY"));

        let bare = provider(ProviderKind::Openai, ProviderSettings::default());
        let err = require_credential(&bare, None).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn resolved_key_or_self_hosted_kind_passes() {
        let openai = provider(ProviderKind::Openai, ProviderSettings::default());
        assert_eq!(
            require_credential(&openai, Some("sk-1".into())).unwrap(),
            Some("sk-1".to_string())
        );

        for kind in [ProviderKind::OpenaiCompatible, ProviderKind::Ollama] {
            let cfg = provider(kind, ProviderSettings::default());
            assert_eq!(require_credential(&cfg, None).unwrap(), None);
        }
    }

    #[test]
    fn openai_compatible_requires_base_url() {
        let cfg = provider(ProviderKind::OpenaiCompatible, ProviderSettings::default());
        let err = OpenAiCompatibleProvider::from_config(&cfg).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting { ref setting, .. } if setting == "api_url"
        ));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let cfg = provider(
            ProviderKind::OpenaiCompatible,
            ProviderSettings {
                api_url: Some("not a url".into()),
                ..Default::default()
            },
        );
        assert!(matches!(
            OpenAiCompatibleProvider::from_config(&cfg).unwrap_err(),
            ConfigError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn key_is_optional_for_self_hosted_kinds() {
        let cfg = provider(
            ProviderKind::OpenaiCompatible,
            ProviderSettings {
                api_url: Some("http://vllm:8000/".into()),
                ..Default::default()
            },
        );
        let p = OpenAiCompatibleProvider::from_config(&cfg).unwrap();
        assert_eq!(p.endpoint(), "http://vllm:8000/v1/chat/completions");
        assert_eq!(p.kind(), ProviderKind::OpenaiCompatible);
    }

    #[test]
    fn debug_output_redacts_key() {
        let cfg = provider(
            ProviderKind::Openai,
            ProviderSettings {
                api_key: Some("sk-secret".into()),
                ..Default::default()
            },
        );
        let p = OpenAiCompatibleProvider::from_config(&cfg).unwrap();
        let debug = format!("{p:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
