//! Huobi Exchange Adapter - Canonical Contract over the Spot REST API
//!
//! Implements `ExchangeApi` on top of the signed `HuobiRest` transport.
//! Venue payloads are mapped into canonical shapes by the pure
//! `canonical_*` functions below; the adapter itself only picks
//! endpoints and parameters.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::client::{HuobiRest, RestConfig};
use super::types::{
    AccountBalance, AccountInfo, BatchCancelBody, BatchCancelResult, BalanceRow, HuobiOrder,
    KlineBar, MergedTicker, PlaceOrderBody, SymbolInfo,
};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::failure::FailureCategory;
use crate::domain::market::{BalanceMap, Candle, Kline, KlinePeriod, SymbolDetails, SymbolTable, Ticker};
use crate::domain::order::{
    CancelAck, CancelAllAck, Order, OrderRef, OrderStatus, OrderType, PreparedOrder, Side,
    TimeInForce,
};
use crate::error::{BootstrapError, ExchangeError};
use crate::ports::exchange::{ConnectRequest, ExchangeApi, VenueConnector};
use crate::ports::failure::FailureSink;

/// Venue name served by this adapter.
pub const VENUE: &str = "huobi";

/// Largest kline page the venue serves.
const MAX_KLINE_SIZE: usize = 2000;

/// Page size for open orders.
const OPEN_ORDERS_PAGE: &str = "500";

/// Largest decimal scale `rust_decimal` represents.
const MAX_PRECISION: u32 = 28;

/// Balance row type holding available funds; every other type is frozen.
const TRADE_ROW: &str = "trade";

/// Venue states after which an order can no longer change.
const TERMINAL_STATES: [&str; 3] = ["filled", "canceled", "partial-canceled"];

/// Map one symbol entry. `None` when the precision cannot be represented.
pub fn canonical_symbol(info: &SymbolInfo) -> Option<SymbolDetails> {
    if info.price_precision > MAX_PRECISION || info.amount_precision > MAX_PRECISION {
        return None;
    }
    Some(SymbolDetails::new(
        &info.symbol,
        &info.base_currency,
        &info.quote_currency,
        info.price_precision,
        info.amount_precision,
        info.limit_order_min_order_amt,
        info.min_order_value,
    ))
}

/// Build the symbol table keyed by uppercase symbol.
pub fn canonical_symbol_table(infos: &[SymbolInfo]) -> SymbolTable {
    infos
        .iter()
        .filter_map(|info| {
            let details = canonical_symbol(info);
            if details.is_none() {
                debug!(symbol = %info.symbol, "Skipping symbol with unsupported precision");
            }
            details
        })
        .map(|details| (details.symbol.clone(), details))
        .collect()
}

/// The symbol is the second segment of the channel name.
pub fn canonical_ticker(raw: &MergedTicker) -> Result<Ticker, String> {
    let symbol = raw
        .ch
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("ticker channel without symbol: {}", raw.ch))?;
    Ok(Ticker {
        symbol: symbol.to_uppercase(),
        ask_price: raw.tick.ask[0],
        ask_size: raw.tick.ask[1],
        bid_price: raw.tick.bid[0],
        bid_size: raw.tick.bid[1],
        timestamp_ms: raw.ts,
    })
}

/// Bars arrive newest first; the canonical kline is oldest first.
pub fn canonical_kline(bars: Vec<KlineBar>) -> Kline {
    let mut kline: Kline = bars
        .into_iter()
        .map(|bar| Candle {
            timestamp_sec: bar.id,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.amount,
        })
        .collect();
    kline.sort_by_key(|candle| candle.timestamp_sec);
    kline
}

/// Sum sub-type rows per currency.
pub fn canonical_balances(rows: &[BalanceRow]) -> BalanceMap {
    let mut balances = BalanceMap::new();
    for row in rows {
        let entry = balances.entry(row.currency.to_lowercase()).or_default();
        if row.row_type == TRADE_ROW {
            entry.add_free(row.balance);
        } else {
            entry.add_frozen(row.balance);
        }
    }
    balances
}

fn parse_side(order_type: &str) -> Option<Side> {
    match order_type.split('-').next()? {
        "buy" => Some(Side::Buy),
        "sell" => Some(Side::Sell),
        _ => None,
    }
}

/// Map a venue order into the canonical shape.
///
/// Closed once the venue stamped a finish time at or after creation, or
/// once the state is terminal.
pub fn canonical_order(raw: HuobiOrder) -> Result<Order, String> {
    let side = parse_side(&raw.order_type)
        .ok_or_else(|| format!("order {} has unknown type {}", raw.id, raw.order_type))?;

    let finished = raw
        .finished_at
        .is_some_and(|finished| finished > 0 && finished >= raw.created_at);
    let status = if finished || TERMINAL_STATES.contains(&raw.state.as_str()) {
        OrderStatus::Closed
    } else {
        OrderStatus::Open
    };

    // Zero when nothing filled or the ratio does not fit a Decimal.
    let average_price = if raw.filled_amount > Decimal::ZERO {
        raw.filled_cash_amount
            .checked_div(raw.filled_amount)
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    let order_type = if raw.order_type.contains("market") {
        OrderType::Market
    } else {
        OrderType::Limit
    };

    Ok(Order {
        symbol: raw.symbol.to_uppercase(),
        order_id: raw.id.to_string(),
        client_order_id: raw.client_order_id.filter(|cid| !cid.is_empty()),
        status,
        side,
        filled_size: raw.filled_amount,
        average_price,
        order_price: raw.price.filter(|p| *p > Decimal::ZERO),
        order_size: Some(raw.amount),
        order_type: Some(order_type),
        created_at_ms: Some(raw.created_at),
    })
}

/// Venue order type string for a prepared order.
pub fn venue_order_type(order: &PreparedOrder) -> Result<String, ExchangeError> {
    let request = order.request();
    if request.order_type == OrderType::Market {
        return Err(ExchangeError::InvalidRequest(
            "market orders are not supported".to_string(),
        ));
    }
    let side = order.side().as_str();
    match (request.post_only, request.time_in_force) {
        (true, None | Some(TimeInForce::Gtc)) => Ok(format!("{side}-limit-maker")),
        (true, Some(tif)) => Err(ExchangeError::InvalidRequest(format!(
            "post-only cannot be combined with {tif:?}"
        ))),
        (false, Some(TimeInForce::Ioc)) => Ok(format!("{side}-ioc")),
        (false, Some(TimeInForce::Fok)) => Ok(format!("{side}-limit-fok")),
        (false, None | Some(TimeInForce::Gtc)) => Ok(format!("{side}-limit")),
    }
}

/// Huobi spot adapter bound to one account.
pub struct HuobiExchange {
    /// Signed transport.
    rest: HuobiRest,
    /// Numeric account id used by balance and order endpoints.
    account_id: String,
    /// Symbol metadata fetched at construction.
    symbols: SymbolTable,
    /// Circuit breaker intake, for payloads that decode but cannot be mapped.
    failures: Arc<dyn FailureSink>,
}

impl HuobiExchange {
    /// Fetch symbol metadata and the account id, then build the adapter.
    ///
    /// # Errors
    /// Any failure here is fatal: the adapter cannot place orders without
    /// symbol metadata or an account.
    #[instrument(skip(rest, failures), fields(venue = %rest.name()))]
    pub async fn connect(
        rest: HuobiRest,
        account_type: &str,
        failures: Arc<dyn FailureSink>,
    ) -> Result<Self, BootstrapError> {
        let infos: Vec<SymbolInfo> = rest
            .get("load_symbols", "/v1/common/symbols", BTreeMap::new(), false)
            .await
            .map_err(|e| BootstrapError::SymbolMetadata {
                venue: rest.name().to_string(),
                message: e.to_string(),
            })?;
        let symbols = canonical_symbol_table(&infos);

        let accounts: Vec<AccountInfo> = rest
            .get("load_accounts", "/v1/account/accounts", BTreeMap::new(), true)
            .await
            .map_err(|e| BootstrapError::AccountLookup {
                venue: rest.name().to_string(),
                message: e.to_string(),
            })?;
        let account = accounts
            .iter()
            .find(|a| a.account_type == account_type)
            .ok_or_else(|| BootstrapError::AccountNotFound {
                venue: rest.name().to_string(),
                account_type: account_type.to_string(),
            })?;

        info!(
            symbols = symbols.len(),
            account_id = account.id,
            account_type,
            "Huobi adapter connected"
        );

        Ok(Self {
            account_id: account.id.to_string(),
            rest,
            symbols,
            failures,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// A payload decoded but could not be mapped: count it like any other
    /// transport failure.
    fn malformed(&self, operation: &'static str, message: String) -> ExchangeError {
        warn!(venue = %self.rest.name(), operation, %message, "Malformed venue payload");
        self.failures
            .report(FailureCategory::Request, self.rest.name(), &format!("{operation}: {message}"));
        ExchangeError::Transport { operation, message }
    }

    fn map_order(&self, operation: &'static str, raw: HuobiOrder) -> Result<Order, ExchangeError> {
        canonical_order(raw).map_err(|message| self.malformed(operation, message))
    }

    fn params<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Order as known locally when the post-placement fetch failed.
    fn submitted_order(order: &PreparedOrder, order_id: String) -> Order {
        Order {
            symbol: order.symbol().to_string(),
            order_id,
            client_order_id: order.request().client_order_id.clone(),
            status: OrderStatus::Open,
            side: order.side(),
            filled_size: Decimal::ZERO,
            average_price: Decimal::ZERO,
            order_price: Some(order.price()),
            order_size: Some(order.size()),
            order_type: Some(OrderType::Limit),
            created_at_ms: None,
        }
    }
}

#[async_trait]
impl ExchangeApi for HuobiExchange {
    fn name(&self) -> &str {
        self.rest.name()
    }

    fn symbol_details(&self, symbol: &str) -> Option<&SymbolDetails> {
        self.symbols.get(&symbol.to_uppercase())
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let raw: MergedTicker = self
            .rest
            .get(
                "get_ticker",
                "/market/detail/merged",
                Self::params([("symbol", symbol.to_lowercase())]),
                false,
            )
            .await?;
        canonical_ticker(&raw).map_err(|message| self.malformed("get_ticker", message))
    }

    async fn get_kline(
        &self,
        symbol: &str,
        period: KlinePeriod,
        size: usize,
    ) -> Result<Kline, ExchangeError> {
        let size = size.clamp(1, MAX_KLINE_SIZE);
        let bars: Vec<KlineBar> = self
            .rest
            .get(
                "get_kline",
                "/market/history/kline",
                Self::params([
                    ("symbol", symbol.to_lowercase()),
                    ("period", period.as_str().to_string()),
                    ("size", size.to_string()),
                ]),
                false,
            )
            .await?;
        Ok(canonical_kline(bars))
    }

    async fn get_balances(&self) -> Result<BalanceMap, ExchangeError> {
        let path = format!("/v1/account/accounts/{}/balance", self.account_id);
        let raw: AccountBalance = self
            .rest
            .get("get_balances", &path, BTreeMap::new(), true)
            .await?;
        Ok(canonical_balances(&raw.list))
    }

    async fn get_active_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        let raw: Vec<HuobiOrder> = self
            .rest
            .get(
                "get_active_orders",
                "/v1/order/openOrders",
                Self::params([
                    ("account-id", self.account_id.clone()),
                    ("symbol", symbol.to_lowercase()),
                    ("size", OPEN_ORDERS_PAGE.to_string()),
                ]),
                true,
            )
            .await?;
        raw.into_iter()
            .map(|order| self.map_order("get_active_orders", order))
            .collect()
    }

    #[instrument(skip(self, order), fields(symbol = %order.symbol(), side = %order.side()))]
    async fn submit_order(&self, order: PreparedOrder) -> Result<Order, ExchangeError> {
        let body = PlaceOrderBody {
            account_id: self.account_id.clone(),
            symbol: order.symbol().to_lowercase(),
            order_type: venue_order_type(&order)?,
            amount: order.size().to_string(),
            price: Some(order.price().to_string()),
            client_order_id: order.request().client_order_id.clone(),
        };

        let placed: Value = self
            .rest
            .post("place_order", "/v1/order/orders/place", &body)
            .await?;
        let order_id = match placed {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => return Err(self.malformed("place_order", format!("unexpected order id {other}"))),
        };
        info!(
            order_id = %order_id,
            size = %order.size(),
            price = %order.price(),
            "Order placed"
        );

        match self
            .get_order(&OrderRef::Id(order_id.clone()), order.symbol())
            .await
        {
            Ok(placed) => Ok(placed),
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Placed order not fetched back");
                Ok(Self::submitted_order(&order, order_id))
            }
        }
    }

    async fn cancel_order(
        &self,
        order_ref: &OrderRef,
        symbol: Option<&str>,
    ) -> Result<CancelAck, ExchangeError> {
        let _: Value = match order_ref {
            OrderRef::Id(id) => {
                let path = format!("/v1/order/orders/{id}/submitcancel");
                let body = symbol.map_or_else(|| json!({}), |s| json!({ "symbol": s.to_lowercase() }));
                self.rest.post("cancel_order", &path, &body).await?
            }
            OrderRef::ClientId(cid) => {
                let body = json!({ "client-order-id": cid });
                self.rest
                    .post("cancel_order", "/v1/order/orders/submitCancelClientOrder", &body)
                    .await?
            }
        };
        info!(order = %order_ref, "Cancel submitted");
        Ok(CancelAck {
            order_ref: order_ref.clone(),
        })
    }

    async fn cancel_all(&self, symbol: &str) -> Result<CancelAllAck, ExchangeError> {
        let body = BatchCancelBody {
            account_id: self.account_id.clone(),
            symbol: symbol.to_lowercase(),
        };
        let result: BatchCancelResult = self
            .rest
            .post("cancel_all", "/v1/order/orders/batchCancelOpenOrders", &body)
            .await?;
        info!(
            symbol,
            succeeded = result.success_count,
            failed = result.failed_count,
            "Cancel-all submitted"
        );
        Ok(CancelAllAck {
            succeeded: result.success_count,
            failed: result.failed_count,
        })
    }

    async fn get_order(&self, order_ref: &OrderRef, symbol: &str) -> Result<Order, ExchangeError> {
        let raw: HuobiOrder = match order_ref {
            OrderRef::Id(id) => {
                let path = format!("/v1/order/orders/{id}");
                self.rest.get("get_order", &path, BTreeMap::new(), true).await?
            }
            OrderRef::ClientId(cid) => {
                self.rest
                    .get(
                        "get_order",
                        "/v1/order/orders/getClientOrder",
                        Self::params([("clientOrderId", cid.clone())]),
                        true,
                    )
                    .await?
            }
        };
        debug!(order = %order_ref, symbol, state = %raw.state, "Order fetched");
        self.map_order("get_order", raw)
    }
}

/// Builds `HuobiExchange` adapters for the registry.
pub struct HuobiConnector {
    /// Transport settings shared by every adapter this connector builds.
    rest: RestConfig,
    /// Account type used when the credential file names none.
    default_account_type: String,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl HuobiConnector {
    pub fn new(rest: RestConfig, default_account_type: &str) -> Self {
        Self {
            rest,
            default_account_type: default_account_type.to_string(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl VenueConnector for HuobiConnector {
    fn venue(&self) -> &str {
        VENUE
    }

    async fn connect(
        &self,
        request: ConnectRequest<'_>,
    ) -> Result<Arc<dyn ExchangeApi>, BootstrapError> {
        let mut rest = HuobiRest::new(
            request.name,
            &request.credentials,
            self.rest.clone(),
            Arc::clone(&request.failures),
        )?;
        if let Some(metrics) = &self.metrics {
            rest = rest.with_metrics(Arc::clone(metrics));
        }
        let account_type = request
            .credentials
            .account_type
            .as_deref()
            .unwrap_or(&self.default_account_type);

        let exchange = HuobiExchange::connect(rest, account_type, request.failures).await?;
        if exchange.symbol_details(request.symbol).is_none() {
            warn!(symbol = request.symbol, "Configured symbol missing from venue metadata");
        }
        Ok(Arc::new(exchange))
    }
}
