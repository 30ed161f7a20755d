//! Prometheus metrics collection for askai
//!
//! Tracks:
//! - Ask requests by route and outcome
//! - Provider call latency by route
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Ask route label
///
/// An enum rather than a string keeps label cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/askAI`
    Ask,
    /// `/askAILangChain4j`
    AskOrchestrated,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Ask => "ask",
            Route::AskOrchestrated => "ask_orchestrated",
        }
    }
}

/// Request outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Metrics collector for askai
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: CounterVec,
    provider_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 2 routes x 2 outcomes = 4 time series
        let requests_total = CounterVec::new(
            Opts::new(
                "askai_requests_total",
                "Total number of ask requests by route and outcome",
            ),
            &["route", "outcome"],
        )?;

        let provider_duration = HistogramVec::new(
            HistogramOpts::new(
                "askai_provider_duration_seconds",
                "Time spent building the client and waiting for the provider, in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["route"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(provider_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            provider_duration,
        })
    }

    /// Count one ask request
    pub fn record_request(&self, route: Route, outcome: Outcome) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[route.as_str(), outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Observe provider latency
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative durations; they would corrupt the
    /// histogram's percentiles.
    pub fn record_provider_duration(
        &self,
        route: Route,
        seconds: f64,
    ) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                seconds
            )));
        }

        self.provider_duration
            .get_metric_with_label_values(&[route.as_str()])?
            .observe(seconds);
        Ok(())
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Metrics output is not valid UTF-8: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_succeeds() {
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_request_appears_in_output() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request(Route::Ask, Outcome::Success).unwrap();
        metrics.record_request(Route::Ask, Outcome::Success).unwrap();
        metrics
            .record_request(Route::AskOrchestrated, Outcome::Error)
            .unwrap();

        let output = metrics.gather().unwrap();
        assert!(output.contains(r#"askai_requests_total{outcome="success",route="ask"} 2"#));
        assert!(
            output.contains(r#"askai_requests_total{outcome="error",route="ask_orchestrated"} 1"#)
        );
    }

    #[test]
    fn test_record_provider_duration() {
        let metrics = Metrics::new().unwrap();
        metrics.record_provider_duration(Route::Ask, 0.3).unwrap();

        let output = metrics.gather().unwrap();
        assert!(output.contains(r#"askai_provider_duration_seconds_count{route="ask"} 1"#));
    }

    #[test]
    fn test_record_provider_duration_rejects_invalid_values() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.record_provider_duration(Route::Ask, f64::NAN).is_err());
        assert!(
            metrics
                .record_provider_duration(Route::Ask, f64::INFINITY)
                .is_err()
        );
        assert!(metrics.record_provider_duration(Route::Ask, -1.0).is_err());
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_request(Route::Ask, Outcome::Success).unwrap();
        assert!(!b.gather().unwrap().contains("askai_requests_total{"));
    }
}
