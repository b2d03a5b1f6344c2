//! Huobi REST Request/Response Types
//!
//! Wire shapes of the spot REST API. Field naming is kebab-case and is
//! not consistent across endpoints; serde aliases absorb the differences
//! so canonicalization only ever sees one field name.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Entry of `/v1/account/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub id: u64,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Entry of `/v1/common/symbols`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub price_precision: u32,
    pub amount_precision: u32,
    /// Minimum notional for limit and market-buy orders, in quote currency.
    #[serde(default)]
    pub min_order_value: Decimal,
    /// Minimum limit order amount.
    #[serde(default, alias = "min-order-amt")]
    pub limit_order_min_order_amt: Decimal,
    #[serde(default)]
    pub state: Option<String>,
}

/// Body of `/market/detail/merged`. Not wrapped in `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct MergedTicker {
    /// Channel name, e.g. `market.btcusdt.detail.merged`.
    pub ch: String,
    /// Server time, Unix ms.
    pub ts: i64,
    pub tick: MergedTick,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergedTick {
    /// `[price, size]`
    pub ask: [Decimal; 2],
    /// `[price, size]`
    pub bid: [Decimal; 2],
}

/// Entry of `/market/history/kline`, newest first on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineBar {
    /// Bar open time, Unix seconds.
    pub id: i64,
    pub open: Decimal,
    pub close: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    /// Volume in base currency.
    pub amount: Decimal,
}

/// Body of `/v1/account/accounts/{id}/balance`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    pub list: Vec<BalanceRow>,
}

/// One currency/sub-type row. A currency appears once per sub-type.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRow {
    pub currency: String,
    /// `trade` (available) or `frozen`.
    #[serde(rename = "type")]
    pub row_type: String,
    pub balance: Decimal,
}

/// Order as returned by both the single-order and open-orders endpoints.
///
/// `GET /v1/order/orders/{id}` spells the fill fields `field-amount` and
/// `field-cash-amount`; `GET /v1/order/openOrders` spells them
/// `filled-amount` and `filled-cash-amount`. Both land in `filled_*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HuobiOrder {
    pub id: u64,
    pub symbol: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub created_at: i64,
    /// e.g. `buy-limit`, `sell-limit-maker`.
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default, alias = "field-amount")]
    pub filled_amount: Decimal,
    #[serde(default, alias = "field-cash-amount")]
    pub filled_cash_amount: Decimal,
    /// Absent on the open-orders endpoint.
    #[serde(default)]
    pub finished_at: Option<i64>,
    /// e.g. `submitted`, `partial-filled`, `filled`, `canceled`.
    pub state: String,
}

/// Body of `POST /v1/order/orders/place`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderBody {
    #[serde(rename = "account-id")]
    pub account_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "client-order-id", skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

/// Body of `POST /v1/order/orders/batchCancelOpenOrders`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchCancelBody {
    #[serde(rename = "account-id")]
    pub account_id: String,
    pub symbol: String,
}

/// Result of `POST /v1/order/orders/batchCancelOpenOrders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchCancelResult {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_order_field_spelling() {
        let json = r#"{"id": 180286878676697, "symbol": "betheth", "account-id": 17155432,
            "client-order-id": "1609501207", "amount": "0.040000000000000000",
            "price": "1.700000000000000000", "created-at": 1609501207342, "type": "sell-limit",
            "field-amount": "0.02", "field-cash-amount": "0.034", "field-fees": "0.0",
            "finished-at": 0, "source": "spot-api", "state": "partial-filled", "canceled-at": 0}"#;
        let order: HuobiOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.filled_amount, dec!(0.02));
        assert_eq!(order.filled_cash_amount, dec!(0.034));
        assert_eq!(order.finished_at, Some(0));
    }

    #[test]
    fn test_open_order_field_spelling() {
        let json = r#"{"id": 5454937, "symbol": "ethusdt", "account-id": 30925,
            "amount": "1.0", "price": "0.453", "created-at": 1530604762277, "type": "sell-limit",
            "filled-amount": "0.0", "filled-cash-amount": "0.0", "filled-fees": "0.0",
            "source": "web", "state": "submitted"}"#;
        let order: HuobiOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.filled_amount, dec!(0));
        assert_eq!(order.finished_at, None);
        assert_eq!(order.client_order_id, None);
    }

    #[test]
    fn test_place_body_omits_empty_fields() {
        let body = PlaceOrderBody {
            account_id: "100009".into(),
            symbol: "btcusdt".into(),
            order_type: "buy-limit".into(),
            amount: "0.1".into(),
            price: Some("29999.99".into()),
            client_order_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["account-id"], "100009");
        assert!(json.get("client-order-id").is_none());
    }
}
