//! Gateway Configuration Module
//!
//! Loads the YAML configuration that drives routing:
//! - Server and logging settings (with environment overrides)
//! - Provider definitions (kind + kind-specific connection settings)
//! - Model catalog entries (display name, provider, ordered fallbacks)

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deadline for a whole dispatch (all candidates), in seconds; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.request_timeout_seconds))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Supported provider kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Synthetic responses, no network
    Dummy,
    /// api.openai.com
    Openai,
    /// Any server exposing `/v1/chat/completions` (vLLM, LiteLLM, LocalAI, ...)
    OpenaiCompatible,
    /// Ollama's OpenAI-compatible endpoint
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Dummy => "dummy",
            ProviderKind::Openai => "openai",
            ProviderKind::OpenaiCompatible => "openai_compatible",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Base URL used when the config leaves `api_url` unset
    pub fn default_api_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("https://api.openai.com"),
            ProviderKind::Ollama => Some("http://localhost:11434"),
            ProviderKind::Dummy | ProviderKind::OpenaiCompatible => None,
        }
    }

    /// Environment variables consulted when the config leaves a field unset
    fn env_api_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("OPENAI_API_KEY"),
            _ => None,
        }
    }

    fn env_api_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("OPENAI_API_URL"),
            ProviderKind::Ollama => Some("OLLAMA_API_URL"),
            _ => None,
        }
    }

    fn env_org_id(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("OPENAI_ORG_ID"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique identifier referenced by models
    #[serde(default)]
    pub id: String,

    /// Provider kind
    pub provider: ProviderKind,

    /// Kind-specific connection settings
    #[serde(default)]
    pub config: ProviderSettings,
}

/// Connection settings. Which fields matter depends on the provider kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Inline API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Base URL without the `/v1/chat/completions` suffix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Per-call upstream timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Simulated latency for the dummy provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ProviderConfig {
    /// API key: inline value, then `api_key_env`, then the kind's default env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        non_empty(self.config.api_key.clone())
            .or_else(|| {
                self.config
                    .api_key_env
                    .as_deref()
                    .and_then(|k| non_empty(std::env::var(k).ok()))
            })
            .or_else(|| {
                self.provider
                    .env_api_key()
                    .and_then(|k| non_empty(std::env::var(k).ok()))
            })
    }

    /// Base URL: inline value, then the kind's env var, then the kind's default.
    pub fn resolve_api_url(&self) -> Option<String> {
        non_empty(self.config.api_url.clone())
            .or_else(|| {
                self.provider
                    .env_api_url()
                    .and_then(|k| non_empty(std::env::var(k).ok()))
            })
            .or_else(|| self.provider.default_api_url().map(str::to_string))
    }

    pub fn resolve_org_id(&self) -> Option<String> {
        non_empty(self.config.org_id.clone()).or_else(|| {
            self.provider
                .env_org_id()
                .and_then(|k| non_empty(std::env::var(k).ok()))
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Model catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Caller-facing model identifier
    pub id: String,

    /// Name sent to the upstream provider
    pub name: String,

    /// Provider id this model is served by
    pub provider: String,

    /// Models tried in order when this one fails
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// Non-fatal configuration findings reported at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    UnknownProvider { model: String, provider: String },
    UnknownFallback { model: String, fallback: String },
    /// Models that can reach each other through fallbacks, in config order.
    FallbackCycle { models: Vec<String> },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UnknownProvider { model, provider } => {
                write!(f, "model {model} references unknown provider {provider}")
            }
            ConfigWarning::UnknownFallback { model, fallback } => {
                write!(f, "model {model} lists unknown fallback {fallback}")
            }
            ConfigWarning::FallbackCycle { models } => {
                write!(f, "fallback cycle through models: {}", models.join(", "))
            }
        }
    }
}

impl Config {
    /// Load config from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error: the defaults are used and a warning is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_yaml(&content)?
        } else {
            tracing::warn!(
                "Config file {} not found; starting with defaults",
                path.display()
            );
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate YAML without touching the environment
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override server/logging settings from `BIND_ADDR`, `LOG_LEVEL`, `LOG_FORMAT`
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = non_empty(std::env::var("BIND_ADDR").ok()) {
            self.server.bind_addr = addr;
        }
        if let Some(level) = non_empty(std::env::var("LOG_LEVEL").ok()) {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "text" => self.logging.format = LogFormat::Text,
                _ => {}
            }
        }
    }

    /// Structural checks that make the config unusable when violated
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut provider_ids = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(ConfigError::MissingProviderId);
            }
            if !provider_ids.insert(provider.id.as_str()) {
                return Err(ConfigError::DuplicateProvider(provider.id.clone()));
            }
        }

        let mut model_ids = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(ConfigError::MissingModelId);
            }
            if !model_ids.insert(model.id.as_str()) {
                return Err(ConfigError::DuplicateModel(model.id.clone()));
            }
        }
        Ok(())
    }

    /// Dangling references and fallback cycles. These never block startup:
    /// dispatch skips what it cannot resolve and walks cycles exactly as listed.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let providers: HashSet<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
        let models: HashMap<&str, &ModelConfig> =
            self.models.iter().map(|m| (m.id.as_str(), m)).collect();

        let mut warnings = Vec::new();
        for model in &self.models {
            if !providers.contains(model.provider.as_str()) {
                warnings.push(ConfigWarning::UnknownProvider {
                    model: model.id.clone(),
                    provider: model.provider.clone(),
                });
            }
            for fallback in &model.fallback {
                if !models.contains_key(fallback.as_str()) {
                    warnings.push(ConfigWarning::UnknownFallback {
                        model: model.id.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }

        warnings.extend(
            fallback_cycles(&self.models)
                .into_iter()
                .map(|models| ConfigWarning::FallbackCycle { models }),
        );
        warnings
    }

    /// Get statistics about the configuration
    pub fn stats(&self) -> ConfigStats {
        let mut provider_kinds = HashMap::new();
        for provider in &self.providers {
            *provider_kinds
                .entry(provider.provider.as_str().to_string())
                .or_insert(0) += 1;
        }

        ConfigStats {
            total_providers: self.providers.len(),
            total_models: self.models.len(),
            models_with_fallbacks: self
                .models
                .iter()
                .filter(|m| !m.fallback.is_empty())
                .count(),
            provider_kinds,
        }
    }
}

/// Strongly connected components of the fallback graph that contain a cycle
/// (two or more members, or a model listing itself), ordered by first member.
///
/// Iterative Tarjan: linear in models plus fallback edges, no recursion.
fn fallback_cycles(models: &[ModelConfig]) -> Vec<Vec<String>> {
    let position: HashMap<&str, usize> = models
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id.as_str(), i))
        .collect();
    let edges: Vec<Vec<usize>> = models
        .iter()
        .map(|m| {
            m.fallback
                .iter()
                .filter_map(|f| position.get(f.as_str()).copied())
                .collect()
        })
        .collect();

    let n = models.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut next_index = 0;
    let mut components: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        index[root] = Some(next_index);
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        // (node, next outgoing edge to look at)
        let mut work = vec![(root, 0usize)];
        while let Some((node, edge)) = work.last().copied() {
            if let Some(&next) = edges[node].get(edge) {
                if let Some(top) = work.last_mut() {
                    top.1 += 1;
                }
                match index[next] {
                    None => {
                        index[next] = Some(next_index);
                        lowlink[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        work.push((next, 0));
                    }
                    Some(next_idx) if on_stack[next] => {
                        lowlink[node] = lowlink[node].min(next_idx);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }
            if Some(lowlink[node]) != index[node] {
                continue;
            }
            let mut members = Vec::new();
            while let Some(member) = stack.pop() {
                on_stack[member] = false;
                members.push(member);
                if member == node {
                    break;
                }
            }
            if members.len() > 1 || edges[node].contains(&node) {
                members.sort_unstable();
                components.push(members);
            }
        }
    }

    components.sort_unstable_by_key(|members| members[0]);
    components
        .into_iter()
        .map(|members| members.into_iter().map(|i| models[i].id.clone()).collect())
        .collect()
}

/// Configuration statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStats {
    pub total_providers: usize,
    pub total_models: usize,
    pub models_with_fallbacks: usize,
    pub provider_kinds: HashMap<String, usize>,
}
