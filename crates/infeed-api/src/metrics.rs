//! Prometheus counters for the decision cycle, served on `/metrics`.
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use infeed_core::InputResponse;
use infeed_decision::{CompletionSink, LoggingSink};

pub struct Metrics {
    registry: Registry,
    /// Completed requests by kind (`stock_return`, `delivery`)
    pub requests: IntCounterVec,
    /// Emitted pack verdicts
    pub packs: IntCounterVec,
    /// Decision cycles aborted by an error
    pub aborted: IntCounter,
    /// Requests refused because no connection was open
    pub unavailable: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("infeed_requests_total", "Completed pack input requests"),
            &["kind"],
        )?;
        let packs = IntCounterVec::new(
            Opts::new("infeed_packs_total", "Pack verdicts emitted"),
            &["verdict"],
        )?;
        let aborted = IntCounter::new("infeed_aborted_total", "Aborted decision cycles")?;
        let unavailable = IntCounter::new(
            "infeed_unavailable_total",
            "Pack input requests received without an open connection",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(packs.clone()))?;
        registry.register(Box::new(aborted.clone()))?;
        registry.register(Box::new(unavailable.clone()))?;

        Ok(Self {
            registry,
            requests,
            packs,
            aborted,
            unavailable,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn observe(&self, response: &InputResponse) {
        let kind = if response
            .delivery_number
            .as_deref()
            .map_or(false, |n| !n.is_empty())
        {
            "delivery"
        } else {
            "stock_return"
        };
        self.requests.with_label_values(&[kind]).inc();
        for pack in &response.packs {
            self.packs
                .with_label_values(&[&pack.handling.kind.to_string()])
                .inc();
        }
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// Completion sink that counts verdicts and then logs
pub struct MetricsSink {
    metrics: Arc<Metrics>,
}

impl MetricsSink {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl CompletionSink for MetricsSink {
    fn finish(&self, response: &InputResponse) {
        self.metrics.observe(response);
        LoggingSink.finish(response);
    }
}
