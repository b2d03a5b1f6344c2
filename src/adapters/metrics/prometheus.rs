//! Prometheus Metrics Registry - Venue and Breaker Observability
//!
//! Registers the `gridline_*` metric families. Transports record request
//! outcomes and latency, the circuit breaker records failure counts and
//! its trip state, the strategy records order flow.

use std::time::Duration;

use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

/// Centralized Prometheus metrics for the bot.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Venue calls by outcome (`ok` / `error`).
    pub requests_total: IntCounterVec,
    /// Venue call latency in milliseconds.
    pub request_latency_ms: HistogramVec,
    /// Failure events recorded by the breaker.
    pub failures_recorded: IntCounterVec,
    /// Failure events currently inside each tracker window.
    pub failures_in_window: IntGaugeVec,
    /// 1 once the breaker has tripped.
    pub breaker_tripped: Gauge,
    /// Orders accepted by the venue.
    pub orders_placed: IntCounterVec,
    /// Cancel-all sweeps issued.
    pub orders_cancelled: IntCounterVec,
    /// Orders refused locally or by the venue.
    pub orders_rejected: IntCounterVec,
    /// Periodic task callback failures.
    pub worker_errors: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("gridline_requests_total", "Venue REST calls by outcome"),
            &["venue", "operation", "outcome"],
        )?;

        let request_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "gridline_request_latency_ms",
                "Venue REST call latency in milliseconds",
            )
            .buckets(vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
            &["venue", "operation"],
        )?;

        let failures_recorded = IntCounterVec::new(
            Opts::new(
                "gridline_failures_recorded_total",
                "Failure events recorded by the circuit breaker",
            ),
            &["category"],
        )?;

        let failures_in_window = IntGaugeVec::new(
            Opts::new(
                "gridline_failures_in_window",
                "Failure events inside the tracker window",
            ),
            &["category"],
        )?;

        let breaker_tripped = Gauge::new(
            "gridline_breaker_tripped",
            "Whether the circuit breaker has tripped (1=yes, 0=no)",
        )?;

        let orders_placed = IntCounterVec::new(
            Opts::new("gridline_orders_placed_total", "Orders accepted by the venue"),
            &["symbol", "side"],
        )?;

        let orders_cancelled = IntCounterVec::new(
            Opts::new(
                "gridline_cancel_all_total",
                "Cancel-all sweeps issued by the strategy",
            ),
            &["symbol"],
        )?;

        let orders_rejected = IntCounterVec::new(
            Opts::new("gridline_orders_rejected_total", "Orders not placed"),
            &["symbol", "reason"],
        )?;

        let worker_errors = IntCounterVec::new(
            Opts::new(
                "gridline_worker_errors_total",
                "Periodic task callback failures",
            ),
            &["worker"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency_ms.clone()))?;
        registry.register(Box::new(failures_recorded.clone()))?;
        registry.register(Box::new(failures_in_window.clone()))?;
        registry.register(Box::new(breaker_tripped.clone()))?;
        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(orders_cancelled.clone()))?;
        registry.register(Box::new(orders_rejected.clone()))?;
        registry.register(Box::new(worker_errors.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_latency_ms,
            failures_recorded,
            failures_in_window,
            breaker_tripped,
            orders_placed,
            orders_cancelled,
            orders_rejected,
            worker_errors,
        })
    }

    /// Record one venue call.
    pub fn observe_request(&self, venue: &str, operation: &str, outcome: &str, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[venue, operation, outcome])
            .inc();
        self.request_latency_ms
            .with_label_values(&[venue, operation])
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    /// Render every family in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_request() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_request("huobi", "get_ticker", "ok", Duration::from_millis(12));
        metrics.breaker_tripped.set(1.0);
        let text = metrics.render();
        assert!(text.contains("gridline_requests_total"));
        assert!(text.contains("operation=\"get_ticker\""));
        assert!(text.contains("gridline_breaker_tripped 1"));
    }
}
