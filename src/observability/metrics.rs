use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

const STATIC_METRIC: &str = "static metric definition must be valid";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token endpoint metrics
    pub token_requests: IntCounter,
    pub token_failures: IntCounterVec,
    pub token_request_duration: Histogram,

    // Cache metrics
    pub token_cache_hits: IntCounter,
    pub token_cache_misses: IntCounter,
    pub cached_tokens: IntGauge,

    // Agent metrics
    pub agent_requests: IntCounterVec,
    pub agent_failures: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("serviceagents".into()), None).expect(STATIC_METRIC);

        let metrics = Self {
            // Token endpoint
            token_requests: IntCounter::new("token_requests_total", "Token endpoint requests").expect(STATIC_METRIC),
            token_failures: IntCounterVec::new(Opts::new("token_failures_total", "Token acquisition failures by reason"), &["reason"]).expect(STATIC_METRIC),
            token_request_duration: Histogram::with_opts(HistogramOpts::new("token_request_duration_seconds", "Token request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).expect(STATIC_METRIC),

            // Cache
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Tokens served from cache").expect(STATIC_METRIC),
            token_cache_misses: IntCounter::new("token_cache_misses_total", "Token lookups that needed the token endpoint").expect(STATIC_METRIC),
            cached_tokens: IntGauge::new("cached_tokens", "Live entries in the token cache").expect(STATIC_METRIC),

            // Agent
            agent_requests: IntCounterVec::new(Opts::new("agent_requests_total", "Requests issued by service agents"), &["service", "method"]).expect(STATIC_METRIC),
            agent_failures: IntCounterVec::new(Opts::new("agent_failures_total", "Failed service agent requests"), &["service", "status"]).expect(STATIC_METRIC),

            registry,
        };

        metrics.register_all();
        Arc::new(metrics)
    }

    fn register_all(&self) {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(self.token_requests.clone()),
            Box::new(self.token_failures.clone()),
            Box::new(self.token_request_duration.clone()),
            Box::new(self.token_cache_hits.clone()),
            Box::new(self.token_cache_misses.clone()),
            Box::new(self.cached_tokens.clone()),
            Box::new(self.agent_requests.clone()),
            Box::new(self.agent_failures.clone()),
        ];
        for collector in collectors {
            if let Err(err) = self.registry.register(collector) {
                warn!("metric registration failed: {}", err);
            }
        }
    }

    /// Render every metric in the prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .context("failed to encode metrics")?;
        String::from_utf8(buffer).context("metrics are not valid utf-8")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposition_contains_prefixed_metrics() {
        let metrics = get_metrics().await;
        metrics.token_requests.inc();
        metrics.agent_requests.with_label_values(&["Demo", "GET"]).inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("serviceagents_token_requests_total"));
        assert!(text.contains("serviceagents_agent_requests_total"));
    }
}
