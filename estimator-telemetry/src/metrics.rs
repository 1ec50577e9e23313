//! OpenTelemetry instruments for the estimator.
//!
//! Instruments are created against the global meter provider; without an
//! exporter installed they are no-ops.
//!
//! - `estimator_runs_total` - estimation requests, by outcome
//! - `estimator_model_calls_total` - model calls, by stage
//! - `estimator_generation_retries_total` - validation-driven regenerations
//! - `estimator_retrieved_epics` - epics returned per similarity query

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::sync::OnceLock;

static METRICS: OnceLock<EstimatorMetrics> = OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn metrics() -> &'static EstimatorMetrics {
    METRICS.get_or_init(|| EstimatorMetrics::new(opentelemetry::global::meter("estimator")))
}

pub struct EstimatorMetrics {
    runs_counter: Counter<u64>,
    model_calls_counter: Counter<u64>,
    retries_counter: Counter<u64>,
    retrieved_histogram: Histogram<u64>,
}

impl EstimatorMetrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            runs_counter: meter
                .u64_counter("estimator_runs_total")
                .with_description("Estimation requests by outcome")
                .init(),
            model_calls_counter: meter
                .u64_counter("estimator_model_calls_total")
                .with_description("Model calls by pipeline stage")
                .init(),
            retries_counter: meter
                .u64_counter("estimator_generation_retries_total")
                .with_description("Generation stage re-runs after failed validation")
                .init(),
            retrieved_histogram: meter
                .u64_histogram("estimator_retrieved_epics")
                .with_description("Epics returned per similarity query")
                .init(),
        }
    }

    pub fn record_run(&self, outcome: &'static str) {
        self.runs_counter.add(1, &[KeyValue::new("outcome", outcome)]);
    }

    pub fn record_model_call(&self, stage: &'static str) {
        self.model_calls_counter.add(1, &[KeyValue::new("stage", stage)]);
    }

    pub fn record_retry(&self) {
        self.retries_counter.add(1, &[]);
    }

    pub fn record_retrieved(&self, count: usize) {
        self.retrieved_histogram.record(count as u64, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_noop_without_provider() {
        let m = metrics();
        m.record_run("success");
        m.record_model_call("analyzer");
        m.record_retry();
        m.record_retrieved(3);
    }
}
