//! Token usage aggregation keyed by (model, provider).

use prometheus::core::Collector;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::models::Usage;

/// Sink for token usage of successful dispatches.
///
/// Injected into the dispatcher so tests can substitute their own collector.
pub trait UsageCollector: Send + Sync {
    fn record(&self, model: &str, provider: &str, usage: &Usage);
}

/// Prometheus-backed counters. Increments are atomic; counters are never reset.
#[derive(Debug, Clone)]
pub struct UsageCounters {
    prompt_tokens: IntCounterVec,
    completion_tokens: IntCounterVec,
    total_tokens: IntCounterVec,
}

const LABELS: &[&str] = &["model", "provider"];

impl UsageCounters {
    /// Create the three counter families and register them in `registry`
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let prompt_tokens = IntCounterVec::new(
            Opts::new(
                "llm_gateway_prompt_tokens_total",
                "Total number of prompt tokens used",
            ),
            LABELS,
        )?;
        let completion_tokens = IntCounterVec::new(
            Opts::new(
                "llm_gateway_completion_tokens_total",
                "Total number of completion tokens used",
            ),
            LABELS,
        )?;
        let total_tokens = IntCounterVec::new(
            Opts::new(
                "llm_gateway_total_tokens_total",
                "Total number of tokens used (prompt + completion)",
            ),
            LABELS,
        )?;

        registry.register(Box::new(prompt_tokens.clone()))?;
        registry.register(Box::new(completion_tokens.clone()))?;
        registry.register(Box::new(total_tokens.clone()))?;

        Ok(Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        })
    }

    /// Current totals for a (model, provider) pair. Reading never creates a series.
    pub fn get(&self, model: &str, provider: &str) -> Usage {
        Usage {
            prompt_tokens: read_counter(&self.prompt_tokens, model, provider),
            completion_tokens: read_counter(&self.completion_tokens, model, provider),
            total_tokens: read_counter(&self.total_tokens, model, provider),
        }
    }
}

fn read_counter(counter: &IntCounterVec, model: &str, provider: &str) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .find(|metric| {
            metric.get_label().iter().all(|pair| match pair.get_name() {
                "model" => pair.get_value() == model,
                "provider" => pair.get_value() == provider,
                _ => true,
            })
        })
        .map(|metric| metric.get_counter().value() as u64)
        .unwrap_or(0)
}

impl UsageCollector for UsageCounters {
    fn record(&self, model: &str, provider: &str, usage: &Usage) {
        let labels = [model, provider];
        // Zero means "not reported" as far as we can tell; skip it.
        if usage.prompt_tokens > 0 {
            self.prompt_tokens
                .with_label_values(&labels)
                .inc_by(usage.prompt_tokens);
        }
        if usage.completion_tokens > 0 {
            self.completion_tokens
                .with_label_values(&labels)
                .inc_by(usage.completion_tokens);
        }
        if usage.total_tokens > 0 {
            self.total_tokens
                .with_label_values(&labels)
                .inc_by(usage.total_tokens);
        }
    }
}
