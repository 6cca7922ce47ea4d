#![forbid(unsafe_code)]
#![doc = r#"
LLM Gateway

Accept OpenAI Chat Completions requests, resolve the requested model to a configured provider, and fall back to alternate models when a provider fails.

Crate highlights
- Library: `Dispatcher::dispatch` walks `[model, ...fallbacks]` and returns the first successful response.
- HTTP server (in `server`): `/v1/chat/completions`, `/v1/models`, `/metrics`, `/status`.
- Providers: OpenAI-compatible HTTP adapter and a synthetic `dummy` adapter, built from YAML config.

Modules
- `models`: Chat Completions request/response types.
- `config`: YAML configuration, env overrides and startup validation.
- `provider`: the `ChatProvider` capability and `ProviderError`.
- `registry` / `catalog`: provider id → adapter, model id → routing entry.
- `dispatcher`: fallback dispatch.
- `usage` / `metrics`: token usage counters and Prometheus exposition.
- `server`: Actix-web routes and access logging.
- `util`: tracing, env loading, HTTP client and shared state helpers.
"#]

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod dummy;
pub mod error;
pub mod metrics;
pub mod models;
pub mod openai_compatible;
pub mod provider;
pub mod registry;
pub mod server;
pub mod usage;
pub mod util;

pub use crate::catalog::ModelCatalog;
pub use crate::config::{
    Config, ConfigStats, ConfigWarning, LogFormat, LoggingConfig, ModelConfig, ProviderConfig,
    ProviderKind, ProviderSettings, ServerConfig,
};
pub use crate::dispatcher::Dispatcher;
pub use crate::dummy::DummyProvider;
pub use crate::error::{ConfigError, GatewayError};
pub use crate::metrics::Metrics;
pub use crate::models::{
    ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    MessageContent, Usage,
};
pub use crate::openai_compatible::OpenAiCompatibleProvider;
pub use crate::provider::{ChatProvider, ProviderError};
pub use crate::registry::ProviderRegistry;
pub use crate::usage::{UsageCollector, UsageCounters};
