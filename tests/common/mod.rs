//! Shared test doubles.
//!
//! `FakeExchange` is an in-memory `ExchangeApi` that records every call.
//! It goes through the real placement policy (the provided
//! `place_order`), so tests see adjusted sizes and prices.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use gridline::domain::market::{Balance, BalanceMap, Candle, Kline, KlinePeriod, SymbolDetails, Ticker};
use gridline::domain::order::{
    CancelAck, CancelAllAck, Order, OrderRef, OrderStatus, OrderType, PreparedOrder, Side,
};
use gridline::error::ExchangeError;
use gridline::ports::exchange::{ConnectRequest, ExchangeApi, VenueConnector};
use gridline::error::BootstrapError;

pub const SYMBOL: &str = "BTCUSDT";

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    orders: Vec<Order>,
    submitted: Vec<PreparedOrder>,
    next_id: u64,
}

pub struct FakeExchange {
    details: SymbolDetails,
    closes: Vec<Decimal>,
    balances: BalanceMap,
    fail_transport: bool,
    state: Mutex<FakeState>,
}

impl FakeExchange {
    /// BTCUSDT with 2 price decimals and 4 size decimals, flat closes at `ma`.
    pub fn new(ma: Decimal) -> Self {
        let mut balances = BalanceMap::new();
        balances.insert(
            "btc".into(),
            Balance {
                free: dec!(1),
                frozen: dec!(0),
                total: dec!(1),
            },
        );
        balances.insert(
            "usdt".into(),
            Balance {
                free: dec!(990),
                frozen: dec!(0),
                total: dec!(990),
            },
        );
        Self {
            details: SymbolDetails::new(SYMBOL, "btc", "usdt", 2, 4, dec!(0.0001), dec!(5)),
            closes: vec![ma; 5],
            balances,
            fail_transport: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Every venue call fails in transport.
    pub fn failing() -> Self {
        let mut fake = Self::new(dec!(100));
        fake.fail_transport = true;
        fake
    }

    pub fn with_resting(self, side: Side, price: Decimal) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.orders.push(resting_order(id, side, price));
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn submitted(&self) -> Vec<PreparedOrder> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn call(&self, name: &str) -> Result<(), ExchangeError> {
        self.state.lock().unwrap().calls.push(name.to_string());
        if self.fail_transport {
            return Err(ExchangeError::Transport {
                operation: "fake",
                message: "connection refused".into(),
            });
        }
        Ok(())
    }
}

pub fn resting_order(id: u64, side: Side, price: Decimal) -> Order {
    Order {
        symbol: SYMBOL.into(),
        order_id: id.to_string(),
        client_order_id: None,
        status: OrderStatus::Open,
        side,
        filled_size: Decimal::ZERO,
        average_price: Decimal::ZERO,
        order_price: Some(price),
        order_size: Some(dec!(0.1)),
        order_type: Some(OrderType::Limit),
        created_at_ms: Some(1_000),
    }
}

#[async_trait]
impl ExchangeApi for FakeExchange {
    fn name(&self) -> &str {
        "fake"
    }

    fn symbol_details(&self, symbol: &str) -> Option<&SymbolDetails> {
        (symbol.to_uppercase() == self.details.symbol).then_some(&self.details)
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        self.call("get_ticker")?;
        Ok(Ticker {
            symbol: symbol.to_uppercase(),
            ask_price: self.closes[0] + dec!(0.01),
            bid_price: self.closes[0] - dec!(0.01),
            ask_size: dec!(1),
            bid_size: dec!(1),
            timestamp_ms: 0,
        })
    }

    async fn get_kline(
        &self,
        _symbol: &str,
        _period: KlinePeriod,
        size: usize,
    ) -> Result<Kline, ExchangeError> {
        self.call("get_kline")?;
        Ok(self
            .closes
            .iter()
            .take(size)
            .enumerate()
            .map(|(i, close)| Candle {
                timestamp_sec: i as i64 * 60,
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: dec!(1),
            })
            .collect())
    }

    async fn get_balances(&self) -> Result<BalanceMap, ExchangeError> {
        self.call("get_balances")?;
        Ok(self.balances.clone())
    }

    async fn get_active_orders(&self, _symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        self.call("get_active_orders")?;
        Ok(self.state.lock().unwrap().orders.clone())
    }

    async fn submit_order(&self, order: PreparedOrder) -> Result<Order, ExchangeError> {
        self.call("submit_order")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let placed = resting_order(state.next_id, order.side(), order.price());
        state.orders.push(placed.clone());
        state.submitted.push(order);
        Ok(placed)
    }

    async fn cancel_order(
        &self,
        order_ref: &OrderRef,
        _symbol: Option<&str>,
    ) -> Result<CancelAck, ExchangeError> {
        self.call("cancel_order")?;
        if let OrderRef::Id(id) = order_ref {
            self.state.lock().unwrap().orders.retain(|o| &o.order_id != id);
        }
        Ok(CancelAck {
            order_ref: order_ref.clone(),
        })
    }

    async fn cancel_all(&self, _symbol: &str) -> Result<CancelAllAck, ExchangeError> {
        self.call("cancel_all")?;
        let mut state = self.state.lock().unwrap();
        let succeeded = state.orders.len() as u64;
        state.orders.clear();
        Ok(CancelAllAck {
            succeeded,
            failed: 0,
        })
    }

    async fn get_order(&self, order_ref: &OrderRef, _symbol: &str) -> Result<Order, ExchangeError> {
        self.call("get_order")?;
        let state = self.state.lock().unwrap();
        state
            .orders
            .iter()
            .find(|o| match order_ref {
                OrderRef::Id(id) => &o.order_id == id,
                OrderRef::ClientId(cid) => o.client_order_id.as_ref() == Some(cid),
            })
            .cloned()
            .ok_or_else(|| ExchangeError::Transport {
                operation: "get_order",
                message: "order not found".into(),
            })
    }
}

/// Connector that builds `FakeExchange`s and counts constructions.
#[derive(Default)]
pub struct FakeConnector {
    pub built: Mutex<usize>,
}

#[async_trait]
impl VenueConnector for FakeConnector {
    fn venue(&self) -> &str {
        "fake"
    }

    async fn connect(
        &self,
        _request: ConnectRequest<'_>,
    ) -> Result<Arc<dyn ExchangeApi>, BootstrapError> {
        *self.built.lock().unwrap() += 1;
        Ok(Arc::new(FakeExchange::new(dec!(100))))
    }
}
