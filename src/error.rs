use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::util::error_response;

/// Startup-time configuration failures. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("provider id is required")]
    MissingProviderId,

    #[error("model id is required")]
    MissingModelId,

    #[error("duplicate provider id: {0}")]
    DuplicateProvider(String),

    #[error("duplicate model id: {0}")]
    DuplicateModel(String),

    #[error("provider {provider}: missing credential ({hint})")]
    MissingCredential { provider: String, hint: String },

    #[error("provider {provider}: missing required setting `{setting}`")]
    MissingSetting { provider: String, setting: String },

    #[error("provider {provider}: invalid base url {url}: {reason}")]
    InvalidUrl {
        provider: String,
        url: String,
        reason: String,
    },

    #[error("provider {provider}: failed to build HTTP client: {source}")]
    HttpClient {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Per-request failures surfaced to callers.
///
/// Upstream detail is never carried here; it only shows up in logs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model not found in config: {0}")]
    ModelNotFound(String),

    #[error("failed to get completion from any provider")]
    Exhausted,

    #[error("request cancelled before a provider completed it")]
    Cancelled,
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Exhausted => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), &self.to_string())
    }
}
