//! Chat Completions wire models.
//!
//! Only the fields the gateway reads are typed; everything else the caller sends
//! is kept in `extra` and forwarded upstream untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, i32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Any other caller-supplied fields, echoed upstream as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatCompletionRequest {
    /// Copy of this request addressed to `model`. The receiver is left untouched.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// `stop` accepts either a single string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// `None` for tool-call turns, which carry `"content": null`.
    #[serde(default)]
    pub content: Option<MessageContent>,

    /// `name`, `tool_calls`, `tool_call_id`, ...
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(MessageContent::Text(content.into())),
            extra: serde_json::Map::new(),
        }
    }

    /// Text view of the content; empty when there is none.
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::as_text)
            .unwrap_or_default()
    }
}

/// Message content: plain text or an array of typed content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Text view of the content; text parts are concatenated, other parts ignored.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Response body of a non-streaming chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token accounting reported by the upstream. Missing fields decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Entry of `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub object: String,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_request_fields_are_echoed() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
            "seed": 7
        });
        let req: ChatCompletionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.extra.get("seed"), Some(&json!(7)));

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["response_format"], json!({"type": "json_object"}));
        assert!(back.get("top_p").is_none());
    }

    #[test]
    fn with_model_leaves_receiver_untouched() {
        let req = ChatCompletionRequest {
            model: "alias".into(),
            messages: vec![ChatMessage::new("user", "hello")],
            user: Some("u-1".into()),
            ..Default::default()
        };
        let attempt = req.with_model("real-model");
        assert_eq!(attempt.model, "real-model");
        assert_eq!(attempt.user.as_deref(), Some("u-1"));
        assert_eq!(req.model, "alias");
    }

    #[test]
    fn content_parts_and_stop_variants_decode() {
        let body = json!({
            "model": "m",
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "a"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "b"}
            ]}],
            "stop": "END"
        });
        let req: ChatCompletionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.messages[0].text(), "ab");
        assert_eq!(req.stop, Some(StopSequences::One("END".into())));
    }

    #[test]
    fn tool_call_messages_keep_their_fields() {
        let body = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "f", "arguments": "{}"}}]
        });
        let msg: ChatMessage = serde_json::from_value(body).unwrap();
        assert_eq!(msg.content, None);
        assert_eq!(msg.text(), "");
        assert!(msg.extra.contains_key("tool_calls"));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["tool_calls"][0]["id"], "call_1");
        assert_eq!(back.get("content"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn upstream_tool_call_reply_passes_through_unchanged() {
        let body = json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 2,
            "model": "m",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "call_9", "type": "function", "function": {"name": "g", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        });
        let resp: ChatCompletionResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&resp).unwrap(), body);
    }

    #[test]
    fn response_without_usage_decodes_as_zero() {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
        });
        let resp: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.usage, Usage::default());
    }
}
