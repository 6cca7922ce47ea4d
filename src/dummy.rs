//! Synthetic provider for development and tests: no network, deterministic
//! token accounting.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ProviderKind;
use crate::models::{
    ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Usage,
};
use crate::provider::{ChatProvider, ProviderError};

pub const DUMMY_CONTENT: &str = "Hello! This is a dummy response.";
const DEFAULT_LATENCY_MS: u64 = 100;
const PROMPT_TOKENS_PER_MESSAGE: u64 = 5;
const COMPLETION_TOKENS: u64 = 10;

pub struct DummyProvider {
    latency: Duration,
}

impl DummyProvider {
    pub fn new(latency_ms: Option<u64>) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms.unwrap_or(DEFAULT_LATENCY_MS)),
        }
    }
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ChatProvider for DummyProvider {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let prompt_tokens = request.messages.len() as u64 * PROMPT_TOKENS_PER_MESSAGE;
        let uuid_str = uuid::Uuid::new_v4().simple().to_string();

        Ok(ChatCompletionResponse {
            id: format!("dummy-cmpl-{}", &uuid_str[..24]),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: request.model.clone(),
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatMessage::new("assistant", DUMMY_CONTENT),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Usage {
                prompt_tokens,
                completion_tokens: COMPLETION_TOKENS,
                total_tokens: prompt_tokens + COMPLETION_TOKENS,
            },
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Dummy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_counts_follow_message_count() {
        let provider = DummyProvider::new(Some(0));
        let request = ChatCompletionRequest {
            model: "dummy-1".into(),
            messages: vec![
                ChatMessage::new("system", "be brief"),
                ChatMessage::new("user", "hi"),
                ChatMessage::new("assistant", "hello"),
            ],
            ..Default::default()
        };

        let resp = provider.chat_completion(&request).await.unwrap();
        assert_eq!(resp.model, "dummy-1");
        assert_eq!(resp.object, "chat.completion");
        assert!(resp.id.starts_with("dummy-cmpl-"));
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].message.text(), DUMMY_CONTENT);
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            resp.usage,
            Usage {
                prompt_tokens: 15,
                completion_tokens: 10,
                total_tokens: 25
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn simulates_latency() {
        let provider = DummyProvider::default();
        let request = ChatCompletionRequest {
            model: "dummy-1".into(),
            ..Default::default()
        };
        let start = tokio::time::Instant::now();
        let resp = provider.chat_completion(&request).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(DEFAULT_LATENCY_MS));
        assert_eq!(resp.usage.prompt_tokens, 0);
        assert_eq!(resp.usage.total_tokens, 10);
    }
}
