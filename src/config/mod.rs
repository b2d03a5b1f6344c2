//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Venue endpoints, breaker thresholds, runner timings and grid
//! parameters are externalized here - nothing is hardcoded in the
//! domain layer.

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::market::{KlinePeriod, PriceSource};

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and metadata.
  pub bot: BotConfig,
  /// Venue connection.
  pub exchange: ExchangeConfig,
  /// Failure-rate circuit breaker.
  #[serde(default)]
  pub breaker: BreakerConfig,
  /// Periodic task runner timings.
  #[serde(default)]
  pub worker: WorkerConfig,
  /// Grid strategy parameters.
  pub strategy: StrategyConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Venue connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// Venue name resolved by the adapter registry (e.g. "huobi").
  pub venue: String,
  /// Traded symbol (e.g. "btcusdt").
  pub symbol: String,
  /// JSON credential file with `key` and `secret`.
  pub credential_path: PathBuf,
  /// REST base URL override; the venue default is used when absent.
  pub base_url: Option<String>,
  /// Sub-account type used for balances and orders.
  #[serde(default = "default_account_type")]
  pub account_type: String,
  /// Per-request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Extra attempts for idempotent (GET) requests on transient errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff), milliseconds.
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
}

impl ExchangeConfig {
  pub const fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  pub const fn retry_base_delay(&self) -> Duration {
    Duration::from_millis(self.retry_base_delay_ms)
  }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
  /// How often trackers are swept and checked, milliseconds.
  #[serde(default = "default_evaluation_interval_ms")]
  pub evaluation_interval_ms: u64,
  /// Control file the shutdown directive is written to.
  #[serde(default = "default_command_file")]
  pub command_file: PathBuf,
  /// REST request failures: high frequency, short window.
  #[serde(default = "default_request_tracker")]
  pub request: TrackerConfig,
  /// Push-channel failures: low frequency, long window.
  #[serde(default = "default_stream_tracker")]
  pub stream: TrackerConfig,
}

impl BreakerConfig {
  pub const fn evaluation_interval(&self) -> Duration {
    Duration::from_millis(self.evaluation_interval_ms)
  }
}

impl Default for BreakerConfig {
  fn default() -> Self {
    Self {
      evaluation_interval_ms: default_evaluation_interval_ms(),
      command_file: default_command_file(),
      request: default_request_tracker(),
      stream: default_stream_tracker(),
    }
  }
}

/// Limit and window for one failure category.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TrackerConfig {
  /// Breach when more than this many events are inside the window.
  pub limit: usize,
  /// Trailing window length in seconds.
  pub window_secs: u64,
}

impl TrackerConfig {
  pub const fn window(&self) -> Duration {
    Duration::from_secs(self.window_secs)
  }
}

/// Periodic task runner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
  /// Delay after a failed callback before the next attempt, milliseconds.
  #[serde(default = "default_error_backoff_ms")]
  pub error_backoff_ms: u64,
  /// Sleep while paused, milliseconds.
  #[serde(default = "default_pause_interval_ms")]
  pub pause_interval_ms: u64,
  /// Command file polling cadence, milliseconds.
  #[serde(default = "default_command_poll_ms")]
  pub command_poll_ms: u64,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      error_backoff_ms: default_error_backoff_ms(),
      pause_interval_ms: default_pause_interval_ms(),
      command_poll_ms: default_command_poll_ms(),
    }
  }
}

/// Grid strategy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
  /// Base currency code (e.g. "btc").
  pub base_currency: String,
  /// Quote currency code (e.g. "usdt").
  pub quote_currency: String,
  /// Kline width feeding the moving average.
  pub ma_kline_period: KlinePeriod,
  /// Number of candles in the moving average.
  pub ma_kline_size: usize,
  /// OHLC field averaged.
  #[serde(default)]
  pub ma_kline_source: PriceSource,
  /// Cancel everything when more orders than this are resting.
  #[serde(default = "default_max_active_orders")]
  pub max_num_active_order: usize,
  /// Distance of each side from the moving average (0.01 = 1%).
  pub spread_rate: Decimal,
  /// Relative drift that triggers a cancel-and-replace.
  pub reorder_rate: Decimal,
  /// Pause between strategy ticks, milliseconds (0 = back to back).
  #[serde(default = "default_trade_loop_period_ms")]
  pub trade_loop_period_ms: u64,
  /// Place maker-only orders.
  #[serde(default)]
  pub post_only: bool,
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address of the health/metrics server.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: default_true(),
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_account_type() -> String {
  "spot".to_string()
}

fn default_timeout_ms() -> u64 {
  5_000
}

fn default_max_retries() -> u32 {
  1
}

fn default_retry_base_delay_ms() -> u64 {
  200
}

fn default_evaluation_interval_ms() -> u64 {
  1_000
}

fn default_command_file() -> PathBuf {
  PathBuf::from("Command.txt")
}

fn default_request_tracker() -> TrackerConfig {
  TrackerConfig {
    limit: 60,
    window_secs: 60,
  }
}

fn default_stream_tracker() -> TrackerConfig {
  TrackerConfig {
    limit: 10,
    window_secs: 600,
  }
}

fn default_error_backoff_ms() -> u64 {
  5_000
}

fn default_pause_interval_ms() -> u64 {
  1_000
}

fn default_command_poll_ms() -> u64 {
  5_000
}

fn default_max_active_orders() -> usize {
  2
}

fn default_trade_loop_period_ms() -> u64 {
  10_000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
