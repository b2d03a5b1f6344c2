//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness drops as
//! soon as the circuit breaker trips or trading stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::watch;
use tracing::{info, instrument};

use super::prometheus::MetricsRegistry;

/// Shared health state polled by readiness probes.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the trade system is running.
    pub trading: AtomicBool,
    /// Whether the circuit breaker has tripped.
    pub breaker_tripped: AtomicBool,
}

impl HealthState {
    /// Not trading yet, breaker armed.
    pub const fn new() -> Self {
        Self {
            trading: AtomicBool::new(false),
            breaker_tripped: AtomicBool::new(false),
        }
    }

    pub fn set_trading(&self, trading: bool) {
        self.trading.store(trading, Ordering::Relaxed);
    }

    pub fn set_breaker_tripped(&self) {
        self.breaker_tripped.store(true, Ordering::Relaxed);
    }

    /// Ready while trading with the breaker armed.
    pub fn is_ready(&self) -> bool {
        self.trading.load(Ordering::Relaxed) && !self.breaker_tripped.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct AppState {
    health: Arc<HealthState>,
    metrics: Arc<MetricsRegistry>,
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    health: Arc<HealthState>,
    metrics: Arc<MetricsRegistry>,
    bind_address: String,
}

impl HealthServer {
    pub fn new(health: Arc<HealthState>, metrics: Arc<MetricsRegistry>, bind_address: &str) -> Self {
        Self {
            health,
            metrics,
            bind_address: bind_address.to_string(),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(AppState {
                health: Arc::clone(&self.health),
                metrics: Arc::clone(&self.metrics),
            })
    }

    /// Serve until `shutdown` flips to true.
    #[instrument(skip(self, shutdown), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!(address = %self.bind_address, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
        if state.health.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
        state.metrics.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_follows_breaker() {
        let state = HealthState::new();
        assert!(!state.is_ready());
        state.set_trading(true);
        assert!(state.is_ready());
        state.set_breaker_tripped();
        assert!(!state.is_ready());
    }
}
