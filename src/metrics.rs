use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::usage::UsageCounters;

/// Process metrics in a registry owned by the gateway (not the prometheus default).
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    usage: Arc<UsageCounters>,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;
        let usage = Arc::new(UsageCounters::register(&registry)?);

        Ok(Self {
            registry,
            http_requests,
            usage,
        })
    }

    pub fn usage(&self) -> Arc<UsageCounters> {
        self.usage.clone()
    }

    pub fn observe_request(&self, method: &str, path: &str) {
        self.http_requests.with_label_values(&[method, path]).inc();
    }

    /// Prometheus text exposition of everything in the registry
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Usage;
    use crate::usage::UsageCollector;

    #[test]
    fn render_includes_http_and_usage_series() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_request("POST", "/v1/chat/completions");
        metrics.usage().record(
            "gpt-4o",
            "openai",
            &Usage {
                prompt_tokens: 12,
                completion_tokens: 8,
                total_tokens: 20,
            },
        );

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"http_requests_total{method="POST",path="/v1/chat/completions"} 1"#));
        assert!(text.contains(r#"llm_gateway_prompt_tokens_total{model="gpt-4o",provider="openai"} 12"#));
        assert!(text.contains(r#"llm_gateway_completion_tokens_total{model="gpt-4o",provider="openai"} 8"#));
        assert!(text.contains(r#"llm_gateway_total_tokens_total{model="gpt-4o",provider="openai"} 20"#));
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.observe_request("GET", "/status");
        assert!(a.render().unwrap().contains("http_requests_total"));
        assert!(!b.render().unwrap().contains("http_requests_total{"));
    }
}
