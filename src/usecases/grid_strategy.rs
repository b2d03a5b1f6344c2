//! Grid Strategy - Moving-Average Band Quoting
//!
//! Each tick:
//! 1. Moving average of the configured kline → buy at `ma*(1-spread)`,
//!    sell at `ma*(1+spread)`
//! 2. Too many resting orders → cancel everything and end the tick
//! 3. Cancel resting orders that drifted `reorder_rate` from target
//! 4. Quote every side without a resting order, sized from free balances
//!
//! Talks to the venue only through `ExchangeApi`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::worker::PeriodicJob;
use crate::adapters::metrics::MetricsRegistry;
use crate::config::StrategyConfig;
use crate::domain::market::BalanceMap;
use crate::domain::order::{CancelAllAck, Order, OrderRef, OrderRequest, Side};
use crate::error::ExchangeError;
use crate::ports::exchange::ExchangeApi;

/// Buy and sell targets around a moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPrices {
  pub moving_average: Decimal,
  pub buy: Decimal,
  pub sell: Decimal,
}

impl GridPrices {
  pub fn around(moving_average: Decimal, spread_rate: Decimal) -> Self {
    Self {
      moving_average,
      buy: moving_average * (Decimal::ONE - spread_rate),
      sell: moving_average * (Decimal::ONE + spread_rate),
    }
  }

  pub const fn target(&self, side: Side) -> Decimal {
    match side {
      Side::Buy => self.buy,
      Side::Sell => self.sell,
    }
  }
}

/// `|1 - target/price| >= rate`. Orders without a price never drift.
pub fn has_drifted(order_price: Option<Decimal>, target: Decimal, rate: Decimal) -> bool {
  match order_price {
    Some(price) if price > Decimal::ZERO => (Decimal::ONE - target / price).abs() >= rate,
    _ => false,
  }
}

/// Order size for `side` from free balances.
pub fn order_size(side: Side, price: Decimal, base_free: Decimal, quote_free: Decimal) -> Decimal {
  match side {
    Side::Buy if price > Decimal::ZERO => quote_free / price,
    Side::Buy => Decimal::ZERO,
    Side::Sell => base_free,
  }
}

/// Grid trading strategy for one symbol.
pub struct GridStrategy {
  api: Arc<dyn ExchangeApi>,
  symbol: String,
  config: StrategyConfig,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl GridStrategy {
  pub fn new(api: Arc<dyn ExchangeApi>, symbol: &str, config: StrategyConfig) -> Self {
    Self {
      api,
      symbol: symbol.to_string(),
      config,
      metrics: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn symbol(&self) -> &str {
    &self.symbol
  }

  async fn prices(&self) -> Result<GridPrices> {
    let ma = self
      .api
      .moving_average(
        &self.symbol,
        self.config.ma_kline_period,
        self.config.ma_kline_size,
        self.config.ma_kline_source,
      )
      .await?
      .context("venue returned no candles")?;
    if ma <= Decimal::ZERO {
      bail!("non-positive moving average {ma}");
    }

    let prices = GridPrices::around(ma, self.config.spread_rate);
    info!(
      symbol = %self.symbol,
      ma = %prices.moving_average,
      buy = %prices.buy,
      sell = %prices.sell,
      "Current grid prices"
    );
    Ok(prices)
  }

  /// Sides that still hold a resting order after drifted ones were cancelled.
  ///
  /// `None` when the order count exceeded the limit and everything was
  /// cancelled instead.
  async fn reconcile(&self, orders: Vec<Order>, prices: &GridPrices) -> Result<Option<Vec<Side>>> {
    if orders.len() > self.config.max_num_active_order {
      warn!(
        symbol = %self.symbol,
        active = orders.len(),
        limit = self.config.max_num_active_order,
        "Active orders exceed limit, cancelling all"
      );
      self.cancel_resting().await?;
      return Ok(None);
    }

    let mut resting = Vec::new();
    for order in orders {
      let target = prices.target(order.side);
      if has_drifted(order.order_price, target, self.config.reorder_rate) {
        info!(
          order_id = %order.order_id,
          side = %order.side,
          price = ?order.order_price,
          target = %target,
          "Order drifted, cancelling"
        );
        self
          .api
          .cancel_order(&OrderRef::Id(order.order_id.clone()), Some(&self.symbol))
          .await?;
      } else {
        debug!(order_id = %order.order_id, side = %order.side, "Order resting");
        resting.push(order.side);
      }
    }
    Ok(Some(resting))
  }

  async fn quote(&self, side: Side, price: Decimal, balances: &BalanceMap) -> Result<()> {
    let free = |currency: &str| balances.get(currency).map(|b| b.free).unwrap_or_default();
    let size = order_size(
      side,
      price,
      free(&self.config.base_currency),
      free(&self.config.quote_currency),
    );
    if size <= Decimal::ZERO {
      debug!(%side, "No free balance to quote");
      return Ok(());
    }

    let mut request = OrderRequest::limit(&self.symbol, side, size, price)
      .with_client_order_id(Uuid::new_v4().simple().to_string());
    if self.config.post_only {
      request = request.post_only();
    }

    match self.api.place_order(request).await {
      Ok(order) => {
        info!(
          order_id = %order.order_id,
          %side,
          size = ?order.order_size,
          price = ?order.order_price,
          "Grid order placed"
        );
        if let Some(metrics) = &self.metrics {
          metrics
            .orders_placed
            .with_label_values(&[self.symbol.as_str(), side.as_str()])
            .inc();
        }
        Ok(())
      }
      Err(ExchangeError::BelowMinimum { reason, .. }) => {
        info!(%side, %size, %price, reason = %reason, "Grid order below venue minimum, skipped");
        if let Some(metrics) = &self.metrics {
          metrics
            .orders_rejected
            .with_label_values(&[self.symbol.as_str(), "below_minimum"])
            .inc();
        }
        Ok(())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// One strategy iteration.
  #[instrument(skip(self), fields(symbol = %self.symbol))]
  pub async fn tick(&self) -> Result<()> {
    let prices = self.prices().await?;
    let orders = self.api.get_active_orders(&self.symbol).await?;
    let Some(resting) = self.reconcile(orders, &prices).await? else {
      return Ok(());
    };

    let balances = self.api.get_balances().await?;
    for side in [Side::Buy, Side::Sell] {
      if !resting.contains(&side) {
        self.quote(side, prices.target(side), &balances).await?;
      }
    }
    Ok(())
  }

  /// Cancel every resting order for the symbol.
  pub async fn cancel_resting(&self) -> Result<CancelAllAck, ExchangeError> {
    let ack = self.api.cancel_all(&self.symbol).await?;
    if let Some(metrics) = &self.metrics {
      metrics.orders_cancelled.with_label_values(&[self.symbol.as_str()]).inc();
    }
    Ok(ack)
  }
}

#[async_trait]
impl PeriodicJob for GridStrategy {
  async fn run_once(&self) -> Result<()> {
    self.tick().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_grid_prices_around_ma() {
    let prices = GridPrices::around(dec!(100), dec!(0.01));
    assert_eq!(prices.buy, dec!(99.00));
    assert_eq!(prices.sell, dec!(101.00));
    assert_eq!(prices.target(Side::Sell), dec!(101.00));
  }

  #[test]
  fn test_drift_threshold_inclusive() {
    assert!(has_drifted(Some(dec!(100)), dec!(99.5), dec!(0.005)));
    assert!(!has_drifted(Some(dec!(100)), dec!(99.6), dec!(0.005)));
    assert!(!has_drifted(None, dec!(1), dec!(0.005)));
  }

  #[test]
  fn test_order_size_from_free_balances() {
    assert_eq!(order_size(Side::Buy, dec!(50), dec!(1), dec!(100)), dec!(2));
    assert_eq!(order_size(Side::Sell, dec!(50), dec!(1.5), dec!(100)), dec!(1.5));
    assert_eq!(order_size(Side::Buy, dec!(0), dec!(1), dec!(100)), dec!(0));
  }
}
