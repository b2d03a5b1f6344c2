//! Gridline - Entry Point
//!
//! Builds every component explicitly and owns the init/teardown order.
//!
//! Wiring sequence:
//! 1. Load config (path from argv, default `config.toml`) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create metrics registry, health state, command file
//! 4. Create circuit breaker (failure sink + shutdown trigger)
//! 5. Register venue connectors and resolve the adapter (fatal on error)
//! 6. Spawn health/metrics server and breaker evaluation loop
//! 7. Start trade system (command poll + grid strategy runners)
//! 8. Wait for Ctrl-C or a shutdown command → teardown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use gridline::adapters::huobi::{DEFAULT_BASE_URL, HuobiConnector, RestConfig};
use gridline::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use gridline::adapters::{CommandFile, ExchangeRegistry};
use gridline::config::{self, AppConfig};
use gridline::ports::{CommandChannel, FailureSink};
use gridline::usecases::{CircuitBreaker, CommandProcessor, GridStrategy, TradeSystem, WorkerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.bot.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        venue = %config.exchange.venue,
        symbol = %config.exchange.symbol,
        "Starting gridline"
    );

    // ── 3. Shared state ─────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());
    let commands: Arc<dyn CommandChannel> = Arc::new(
        CommandFile::create(&config.breaker.command_file)
            .context("Failed to open command file")?,
    );

    // ── 4. Circuit breaker ──────────────────────────────────
    let breaker = Arc::new(
        CircuitBreaker::new(&config.breaker, Arc::clone(&commands))
            .with_metrics(Arc::clone(&metrics))
            .with_health(Arc::clone(&health)),
    );

    // ── 5. Adapter registry → venue adapter ─────────────────
    let api = build_registry(&config, Arc::clone(&breaker) as Arc<dyn FailureSink>, &metrics)
        .resolve(
            &config.exchange.venue,
            &config.exchange.symbol,
            &config.exchange.credential_path,
        )
        .await
        .context("Failed to construct exchange adapter")?;

    // ── 6. Background tasks ─────────────────────────────────
    let health_handle = config.metrics.enabled.then(|| {
        let server = HealthServer::new(
            Arc::clone(&health),
            Arc::clone(&metrics),
            &config.metrics.bind_address,
        );
        let rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        })
    });

    let breaker_handle = tokio::spawn(Arc::clone(&breaker).run(shutdown_tx.subscribe()));

    // ── 7. Trade system ─────────────────────────────────────
    let strategy = Arc::new(
        GridStrategy::new(Arc::clone(&api), &config.exchange.symbol, config.strategy.clone())
            .with_metrics(Arc::clone(&metrics)),
    );
    let processor = Arc::new(CommandProcessor::new(
        Arc::clone(&commands),
        Arc::clone(&shutdown_tx),
    ));
    let trade_system = TradeSystem::new(
        strategy,
        WorkerSettings::from_config(
            &config.worker,
            Duration::from_millis(config.strategy.trade_loop_period_ms),
        ),
        processor,
        WorkerSettings::from_config(
            &config.worker,
            Duration::from_millis(config.worker.command_poll_ms),
        ),
    )
    .with_metrics(&metrics)
    .with_health(Arc::clone(&health));

    trade_system.start();
    info!("All tasks spawned, bot is running");

    // ── 8. Wait for Ctrl-C or a shutdown command ────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
        _ = shutdown_rx.wait_for(|stop| *stop) => {
            info!("Shutdown command received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown (strategy → command poll → cancel) ──
    shutdown_tx.send_replace(true);
    if trade_system.stop().await.is_none() {
        warn!("Resting orders could not be confirmed cancelled");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), breaker_handle).await;
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!(breaker = ?breaker.state(), "Shutdown complete");
    Ok(())
}

/// Register every supported venue.
fn build_registry(
    config: &AppConfig,
    failures: Arc<dyn FailureSink>,
    metrics: &Arc<MetricsRegistry>,
) -> ExchangeRegistry {
    let rest = RestConfig {
        base_url: config
            .exchange
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        timeout: config.exchange.timeout(),
        max_retries: config.exchange.max_retries,
        retry_base_delay: config.exchange.retry_base_delay(),
    };
    let huobi = HuobiConnector::new(rest, &config.exchange.account_type)
        .with_metrics(Arc::clone(metrics));

    ExchangeRegistry::new(failures).with_connector(Arc::new(huobi))
}
