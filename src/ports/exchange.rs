//! Exchange Port - Canonical Trading Contract
//!
//! The only surface strategy code talks to. One implementation exists
//! per venue; the adapter registry picks which.
//!
//! Result discipline:
//! - `Ok(..)` is a definite answer, including `Ok(vec![])` for "no orders".
//! - `Err(ExchangeError::Transport { .. })` means the outcome is unknown.
//!   The failure has already been reported to the circuit breaker.
//! - Other `Err` variants are refusals or caller bugs and never reached
//!   the venue.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::market::{self, BalanceMap, Kline, KlinePeriod, PriceSource, SymbolDetails, Ticker};
use crate::domain::order::{CancelAck, CancelAllAck, Order, OrderRef, OrderRequest, PreparedOrder};
use crate::domain::order_policy;
use crate::error::{BootstrapError, ExchangeError};
use crate::ports::failure::FailureSink;

/// Canonical trading operations every venue adapter provides.
#[async_trait]
pub trait ExchangeApi: Send + Sync + 'static {
    /// Adapter identity used in logs and failure reports.
    fn name(&self) -> &str;

    /// Metadata for `symbol` (case-insensitive).
    fn symbol_details(&self, symbol: &str) -> Option<&SymbolDetails>;

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    /// Up to `size` candles, oldest first.
    async fn get_kline(
        &self,
        symbol: &str,
        period: KlinePeriod,
        size: usize,
    ) -> Result<Kline, ExchangeError>;

    /// Balances summed across the venue's sub-account rows.
    async fn get_balances(&self) -> Result<BalanceMap, ExchangeError>;

    async fn get_active_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError>;

    /// Dispatch an order that already passed the placement policy.
    async fn submit_order(&self, order: PreparedOrder) -> Result<Order, ExchangeError>;

    async fn cancel_order(
        &self,
        order_ref: &OrderRef,
        symbol: Option<&str>,
    ) -> Result<CancelAck, ExchangeError>;

    async fn cancel_all(&self, symbol: &str) -> Result<CancelAllAck, ExchangeError>;

    async fn get_order(&self, order_ref: &OrderRef, symbol: &str) -> Result<Order, ExchangeError>;

    /// Apply the shared placement policy, then dispatch.
    ///
    /// Venues implement [`ExchangeApi::submit_order`]; this wrapper is the
    /// one place the size/price policy lives.
    async fn place_order(&self, request: OrderRequest) -> Result<Order, ExchangeError> {
        let details = self
            .symbol_details(&request.symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(request.symbol.clone()))?;
        let prepared = order_policy::prepare(details, request)?;
        self.submit_order(prepared).await
    }

    /// Mean of one OHLC field over the latest `size` candles.
    ///
    /// `Ok(None)` when the venue returned no candles.
    async fn moving_average(
        &self,
        symbol: &str,
        period: KlinePeriod,
        size: usize,
        source: PriceSource,
    ) -> Result<Option<Decimal>, ExchangeError> {
        let kline = self.get_kline(symbol, period, size).await?;
        Ok(market::moving_average(&kline, source))
    }
}

/// Secrets read from a credential file.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
    /// Venue sub-account selector, e.g. `spot`.
    #[serde(default)]
    pub account_type: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("account_type", &self.account_type)
            .finish()
    }
}

/// Everything a connector needs to build one adapter.
pub struct ConnectRequest<'a> {
    /// Adapter identity, e.g. `huobi`.
    pub name: &'a str,
    pub symbol: &'a str,
    pub credentials: Credentials,
    pub failures: Arc<dyn FailureSink>,
}

/// Builds a live adapter for one venue.
///
/// Construction fetches symbol metadata (and anything else the venue
/// needs up front); failure is fatal for the caller.
#[async_trait]
pub trait VenueConnector: Send + Sync + 'static {
    /// Lowercase venue name this connector serves.
    fn venue(&self) -> &str;

    async fn connect(
        &self,
        request: ConnectRequest<'_>,
    ) -> Result<Arc<dyn ExchangeApi>, BootstrapError>;
}
