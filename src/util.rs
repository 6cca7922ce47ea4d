use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::ModelCatalog;
use crate::config::{Config, ConfigStats, LogFormat, LoggingConfig};
use crate::dispatcher::Dispatcher;
use crate::error::ConfigError;
use crate::metrics::Metrics;
use crate::registry::ProviderRegistry;

/// Load an env file, if any, into the process environment.
///
/// Order: explicit path in ENV_FILE / DOTENV_PATH, then `.env` discovery from the
/// working directory. Returns a description of the source used.
pub fn load_env_file() -> String {
    for key in ["ENV_FILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty()
                && std::path::Path::new(p).is_file()
                && dotenvy::from_filename(p).is_ok()
            {
                return format!("{p} ({key})");
            }
        }
    }

    match dotenvy::dotenv() {
        Ok(path) => path.display().to_string(),
        Err(_) => "none".into(),
    }
}

/// Initialize structured tracing.
///
/// RUST_LOG wins when set; otherwise the configured level is used for this crate
/// and everything else.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| logging.level.clone());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            fmt().json().with_env_filter(env_filter).finish(),
        ),
        LogFormat::Text => {
            tracing::subscriber::set_global_default(fmt().with_env_filter(env_filter).finish())
        }
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// HTTP client builder honoring proxy and timeout environment variables.
///
/// Environment:
/// - LLM_GATEWAY_NO_PROXY = 1|true|yes|on  -> disable all proxies
/// - LLM_GATEWAY_PROXY_URL = <url>         -> proxy for all schemes
/// - LLM_GATEWAY_HTTP_TIMEOUT_SECONDS      -> default overall request timeout (u64)
///
/// HTTP_PROXY / HTTPS_PROXY are picked up by reqwest itself.
pub fn http_client_builder_from_env() -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder();

    if let Ok(secs) = std::env::var("LLM_GATEWAY_HTTP_TIMEOUT_SECONDS") {
        if let Ok(n) = secs.trim().parse::<u64>() {
            builder = builder.timeout(Duration::from_secs(n));
        }
    }

    if env_flag("LLM_GATEWAY_NO_PROXY") {
        builder = builder.no_proxy();
    } else if let Ok(url) = std::env::var("LLM_GATEWAY_PROXY_URL") {
        let u = url.trim();
        if !u.is_empty() {
            match reqwest::Proxy::all(u) {
                Ok(p) => builder = builder.proxy(p),
                Err(e) => tracing::warn!("Ignoring invalid LLM_GATEWAY_PROXY_URL {}: {}", u, e),
            }
        }
    }

    builder
        .user_agent(format!("llm-gateway/{}", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(60))
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.trim().to_ascii_lowercase())
        .map(|v| v == "1" || v == "true" || v == "yes" || v == "on")
        .unwrap_or(false)
}

/// Shared application state used by the HTTP server and handlers.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Metrics,
    /// Deadline for one dispatch across all candidates, `None` when disabled
    pub request_timeout: Option<Duration>,
    /// Snapshot of the loaded configuration for `/status`
    pub config_stats: ConfigStats,
}

impl AppState {
    /// Build catalog, registry, metrics and dispatcher from a loaded config.
    ///
    /// Provider construction errors are fatal; dangling references and fallback
    /// cycles are only logged.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        for warning in config.warnings() {
            tracing::warn!("Config: {}", warning);
        }

        let registry = ProviderRegistry::from_configs(&config.providers)?;
        let catalog = ModelCatalog::new(config.models.clone())?;
        let metrics = Metrics::new()?;
        let dispatcher = Dispatcher::new(Arc::new(catalog), Arc::new(registry), metrics.usage());

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            metrics,
            request_timeout: config.server.request_timeout(),
            config_stats: config.stats(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialise metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Build a JSON error response with the given HTTP status and message.
pub fn error_response(status: StatusCode, msg: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": { "message": msg, "code": status.as_u16() } });
    HttpResponse::build(status).json(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_message_and_code() {
        let resp = error_response(StatusCode::NOT_FOUND, "model not found in config: x");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn app_state_from_config_fails_on_bad_provider() {
        let config = Config::from_yaml(
            "providers:\n  - id: vllm\n    provider: openai_compatible\n",
        )
        .unwrap();
        let err = AppState::from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::MissingSetting { .. })
        ));
    }

    #[test]
    fn app_state_from_config_tolerates_dangling_references() {
        let config = Config::from_yaml(
            r#"
server: {request_timeout_seconds: 7}
providers:
  - {id: local, provider: dummy}
models:
  - {id: a, name: a, provider: local, fallback: [ghost, a]}
"#,
        )
        .unwrap();
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.request_timeout, Some(Duration::from_secs(7)));
        assert_eq!(state.dispatcher.catalog().len(), 1);
        assert!(state.dispatcher.registry().contains("local"));
    }
}
