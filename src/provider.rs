//! Provider capability shared by every upstream adapter.

use async_trait::async_trait;

use crate::config::ProviderKind;
use crate::models::{ChatCompletionRequest, ChatCompletionResponse};

/// Upstream failure of a single call. The adapter never retries; the dispatcher
/// decides what to do next.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned non-200 status: {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode upstream response (status {status}): {message}, body: {body}")]
    Decode {
        status: u16,
        body: String,
        message: String,
    },

    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ProviderError {
    /// HTTP status associated with the failure, if the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } | ProviderError::Decode { status, .. } => {
                Some(*status)
            }
            ProviderError::Transport(_) | ProviderError::Encode(_) => None,
        }
    }
}

/// A single upstream chat-completion surface
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one chat completion. `request.model` already carries the upstream
    /// display name.
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError>;

    /// Kind this adapter was built for
    fn kind(&self) -> ProviderKind;
}
