//! Canonical order types.
//!
//! Orders are created by a place operation and afterwards only ever
//! change on the venue; nothing here mutates an order locally.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order pricing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => f.write_str("limit"),
            Self::Market => f.write_str("market"),
        }
    }
}

/// How long a limit order may rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

/// Canonical lifecycle state; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
}

/// Venue order normalized to the canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub status: OrderStatus,
    pub side: Side,
    pub filled_size: Decimal,
    /// Zero when nothing has filled.
    pub average_price: Decimal,
    pub order_price: Option<Decimal>,
    pub order_size: Option<Decimal>,
    pub order_type: Option<OrderType>,
    /// Creation time in Unix milliseconds.
    pub created_at_ms: Option<i64>,
}

impl Order {
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

/// Identifies one order by exactly one of its two ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderRef {
    /// Venue-assigned id.
    Id(String),
    /// Caller-assigned id.
    ClientId(String),
}

impl OrderRef {
    /// Build a reference from two optional ids.
    ///
    /// Exactly one must be supplied; anything else is a caller bug and
    /// fails fast with [`ExchangeError::InvalidRequest`].
    pub fn from_parts(
        order_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<Self, ExchangeError> {
        match (order_id, client_order_id) {
            (Some(id), None) if !id.is_empty() => Ok(Self::Id(id.to_string())),
            (None, Some(cid)) if !cid.is_empty() => Ok(Self::ClientId(cid.to_string())),
            _ => Err(ExchangeError::InvalidRequest(
                "exactly one of order_id and client_order_id must be provided".to_string(),
            )),
        }
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::ClientId(cid) => write!(f, "client:{cid}"),
        }
    }
}

/// Everything a caller supplies to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub client_order_id: Option<String>,
    pub time_in_force: Option<TimeInForce>,
    pub post_only: bool,
}

impl OrderRequest {
    /// Plain resting limit order.
    pub fn limit(symbol: &str, side: Side, size: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            size,
            order_type: OrderType::Limit,
            price: Some(price),
            client_order_id: None,
            time_in_force: None,
            post_only: false,
        }
    }

    #[must_use]
    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    #[must_use]
    pub const fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }
}

/// A limit order after the placement policy has adjusted it.
///
/// Only the shared policy constructs these, so a venue adapter can never
/// dispatch an order that skipped truncation or the tick shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOrder {
    pub(crate) request: OrderRequest,
    pub(crate) size: Decimal,
    pub(crate) price: Decimal,
}

impl PreparedOrder {
    /// Uppercase symbol.
    pub fn symbol(&self) -> &str {
        &self.request.symbol
    }

    pub const fn side(&self) -> Side {
        self.request.side
    }

    /// Size truncated to the symbol's size precision.
    pub const fn size(&self) -> Decimal {
        self.size
    }

    /// Price shifted one tick away from the touch and snapped to the grid.
    pub const fn price(&self) -> Decimal {
        self.price
    }

    pub const fn request(&self) -> &OrderRequest {
        &self.request
    }
}

/// Acknowledgement of a single cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAck {
    pub order_ref: OrderRef,
}

/// Acknowledgement of a cancel-all request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelAllAck {
    pub succeeded: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_ref_requires_exactly_one() {
        assert_eq!(
            OrderRef::from_parts(Some("42"), None).unwrap(),
            OrderRef::Id("42".to_string())
        );
        assert_eq!(
            OrderRef::from_parts(None, Some("c1")).unwrap(),
            OrderRef::ClientId("c1".to_string())
        );
        assert!(matches!(
            OrderRef::from_parts(None, None),
            Err(ExchangeError::InvalidRequest(_))
        ));
        assert!(matches!(
            OrderRef::from_parts(Some("42"), Some("c1")),
            Err(ExchangeError::InvalidRequest(_))
        ));
        assert!(OrderRef::from_parts(Some(""), None).is_err());
    }

    #[test]
    fn test_limit_request_builder() {
        let req = OrderRequest::limit("BTCUSDT", Side::Buy, dec!(1), dec!(100))
            .post_only()
            .with_client_order_id("abc");
        assert!(req.post_only);
        assert_eq!(req.order_type, OrderType::Limit);
        assert_eq!(req.client_order_id.as_deref(), Some("abc"));
        assert_eq!(req.time_in_force, None);
    }
}
