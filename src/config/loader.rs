//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
  let path = path.as_ref();

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;

  info!(
    venue = %config.exchange.venue,
    symbol = %config.exchange.symbol,
    request_limit = config.breaker.request.limit,
    stream_limit = config.breaker.stream.limit,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse TOML")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty venue, symbol and credential path
/// - Positive timeouts, limits and windows
/// - Rates inside (0, 1)
fn validate_config(config: &AppConfig) -> Result<()> {
  // Exchange validation
  anyhow::ensure!(
    !config.exchange.venue.trim().is_empty(),
    "exchange.venue must not be empty"
  );
  anyhow::ensure!(
    !config.exchange.symbol.trim().is_empty(),
    "exchange.symbol must not be empty"
  );
  anyhow::ensure!(
    !config.exchange.credential_path.as_os_str().is_empty(),
    "exchange.credential_path must not be empty"
  );
  anyhow::ensure!(
    config.exchange.timeout_ms > 0,
    "exchange.timeout_ms must be positive"
  );

  // Breaker validation
  anyhow::ensure!(
    config.breaker.evaluation_interval_ms > 0,
    "breaker.evaluation_interval_ms must be positive"
  );
  for (name, tracker) in [
    ("request", &config.breaker.request),
    ("stream", &config.breaker.stream),
  ] {
    anyhow::ensure!(tracker.limit > 0, "breaker.{name}.limit must be positive");
    anyhow::ensure!(
      tracker.window_secs > 0,
      "breaker.{name}.window_secs must be positive"
    );
  }

  // Strategy validation
  let strategy = &config.strategy;
  anyhow::ensure!(
    strategy.ma_kline_size > 0,
    "strategy.ma_kline_size must be positive"
  );
  anyhow::ensure!(
    strategy.max_num_active_order > 0,
    "strategy.max_num_active_order must be positive"
  );
  for (name, rate) in [
    ("spread_rate", strategy.spread_rate),
    ("reorder_rate", strategy.reorder_rate),
  ] {
    anyhow::ensure!(
      rate > Decimal::ZERO && rate < Decimal::ONE,
      "strategy.{name} must be in (0, 1), got {rate}"
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::market::{KlinePeriod, PriceSource};
  use rust_decimal_macros::dec;

  const MINIMAL: &str = r#"
    [bot]
    name = "grid-test"

    [exchange]
    venue = "huobi"
    symbol = "btcusdt"
    credential_path = "keys.json"

    [strategy]
    base_currency = "btc"
    quote_currency = "usdt"
    ma_kline_period = "15min"
    ma_kline_size = 20
    spread_rate = 0.01
    reorder_rate = 0.005
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults_applied() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.bot.log_level, "info");
    assert_eq!(config.exchange.account_type, "spot");
    assert_eq!(config.exchange.timeout_ms, 5_000);
    assert_eq!(config.breaker.request.limit, 60);
    assert_eq!(config.breaker.request.window_secs, 60);
    assert_eq!(config.breaker.stream.limit, 10);
    assert_eq!(config.breaker.stream.window_secs, 600);
    assert_eq!(config.worker.error_backoff_ms, 5_000);
    assert_eq!(config.strategy.ma_kline_period, KlinePeriod::FifteenMinutes);
    assert_eq!(config.strategy.ma_kline_source, PriceSource::Close);
    assert_eq!(config.strategy.spread_rate, dec!(0.01));
  }

  #[test]
  fn test_shipped_sample_is_valid() {
    let config = parse_config(include_str!("../../config.toml")).unwrap();
    assert_eq!(config.exchange.venue, "huobi");
    assert_eq!(config.strategy.reorder_rate, dec!(0.005));
    assert_eq!(config.breaker.command_file.to_str(), Some("Command.txt"));
  }

  #[test]
  fn test_rejects_out_of_range_rate() {
    let bad = MINIMAL.replace("spread_rate = 0.01", "spread_rate = 1.5");
    assert!(parse_config(&bad).is_err());
  }

  #[test]
  fn test_rejects_zero_breaker_limit() {
    let bad = format!("{MINIMAL}\n[breaker.request]\nlimit = 0\nwindow_secs = 60\n");
    assert!(parse_config(&bad).is_err());
  }
}
