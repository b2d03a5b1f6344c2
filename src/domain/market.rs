//! Canonical market data types.
//!
//! Every venue adapter produces these shapes regardless of how the
//! venue names or encodes its fields. All monetary and precision-bearing
//! values are `Decimal` so tick arithmetic stays exact.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading rules for one symbol, loaded once when an adapter is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDetails {
    /// Uppercase symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Decimal places allowed in a price.
    pub price_precision: u32,
    /// Decimal places allowed in an order size.
    pub size_precision: u32,
    /// Always `10^(-price_precision)`.
    pub tick_size: Decimal,
    /// Smallest size accepted for a limit order.
    pub min_limit_order_size: Decimal,
    /// Smallest `size * price` accepted, in quote currency.
    pub min_order_value: Decimal,
}

impl SymbolDetails {
    /// Build details deriving the tick size from the price precision.
    pub fn new(
        symbol: &str,
        base_currency: &str,
        quote_currency: &str,
        price_precision: u32,
        size_precision: u32,
        min_limit_order_size: Decimal,
        min_order_value: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            base_currency: base_currency.to_lowercase(),
            quote_currency: quote_currency.to_lowercase(),
            price_precision,
            size_precision,
            tick_size: tick_size_for(price_precision),
            min_limit_order_size,
            min_order_value,
        }
    }
}

/// `10^(-precision)` as an exact decimal.
pub fn tick_size_for(precision: u32) -> Decimal {
    Decimal::new(1, precision)
}

/// Symbol metadata table keyed by uppercase symbol.
pub type SymbolTable = BTreeMap<String, SymbolDetails>;

/// Best bid/ask snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub ask_price: Decimal,
    pub bid_price: Decimal,
    pub ask_size: Decimal,
    pub bid_size: Decimal,
    /// Venue timestamp in Unix milliseconds.
    pub timestamp_ms: i64,
}

impl Ticker {
    /// Midpoint between the best bid and best ask.
    pub fn mid_price(&self) -> Decimal {
        (self.ask_price + self.bid_price) / Decimal::TWO
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in Unix seconds.
    pub timestamp_sec: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Select one price field of the bar.
    pub fn price(&self, source: PriceSource) -> Decimal {
        match source {
            PriceSource::Open => self.open,
            PriceSource::High => self.high,
            PriceSource::Low => self.low,
            PriceSource::Close => self.close,
        }
    }
}

/// Candle sequence, oldest first.
pub type Kline = Vec<Candle>;

/// Arithmetic mean of one price field over a kline.
///
/// Returns `None` for an empty kline.
pub fn moving_average(kline: &[Candle], source: PriceSource) -> Option<Decimal> {
    if kline.is_empty() {
        return None;
    }
    let sum: Decimal = kline.iter().map(|c| c.price(source)).sum();
    Some(sum / Decimal::from(kline.len()))
}

/// Which OHLC field feeds a moving average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
}

/// Candle width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlinePeriod {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    OneHour,
    #[serde(rename = "4hour")]
    FourHours,
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1mon")]
    OneMonth,
}

impl KlinePeriod {
    /// Short textual form used in configuration and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::ThirtyMinutes => "30min",
            Self::OneHour => "60min",
            Self::FourHours => "4hour",
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
            Self::OneMonth => "1mon",
        }
    }
}

impl fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KlinePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1min" => Ok(Self::OneMinute),
            "5min" => Ok(Self::FiveMinutes),
            "15min" => Ok(Self::FifteenMinutes),
            "30min" => Ok(Self::ThirtyMinutes),
            "60min" | "1hour" => Ok(Self::OneHour),
            "4hour" => Ok(Self::FourHours),
            "1day" => Ok(Self::OneDay),
            "1week" => Ok(Self::OneWeek),
            "1mon" => Ok(Self::OneMonth),
            other => Err(format!("unsupported kline period: {other}")),
        }
    }
}

/// Holdings of one currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub free: Decimal,
    pub frozen: Decimal,
    /// Always `free + frozen`.
    pub total: Decimal,
}

impl Balance {
    /// Add an available amount, keeping `total` in step.
    pub fn add_free(&mut self, amount: Decimal) {
        self.free += amount;
        self.total += amount;
    }

    /// Add a frozen amount, keeping `total` in step.
    pub fn add_frozen(&mut self, amount: Decimal) {
        self.frozen += amount;
        self.total += amount;
    }
}

/// Balances keyed by lowercase currency code.
pub type BalanceMap = BTreeMap<String, Balance>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, close: Decimal) -> Candle {
        Candle {
            timestamp_sec: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn test_tick_size_matches_precision() {
        assert_eq!(tick_size_for(0), dec!(1));
        assert_eq!(tick_size_for(2), dec!(0.01));
        assert_eq!(tick_size_for(8), dec!(0.00000001));
    }

    #[test]
    fn test_symbol_details_normalizes_case() {
        let d = SymbolDetails::new("btcusdt", "BTC", "USDT", 2, 6, dec!(0.0001), dec!(5));
        assert_eq!(d.symbol, "BTCUSDT");
        assert_eq!(d.base_currency, "btc");
        assert_eq!(d.tick_size, dec!(0.01));
    }

    #[test]
    fn test_moving_average() {
        let kline = vec![candle(1, dec!(10)), candle(2, dec!(20)), candle(3, dec!(30))];
        assert_eq!(moving_average(&kline, PriceSource::Close), Some(dec!(20)));
        assert_eq!(moving_average(&[], PriceSource::Close), None);
    }

    #[test]
    fn test_balance_total_tracks_parts() {
        let mut b = Balance::default();
        b.add_free(dec!(3.0));
        b.add_frozen(dec!(2.0));
        assert_eq!(b.total, dec!(5.0));
        assert_eq!(b.total, b.free + b.frozen);
    }

    #[test]
    fn test_kline_period_parse() {
        assert_eq!("15MIN".parse::<KlinePeriod>(), Ok(KlinePeriod::FifteenMinutes));
        assert!("2min".parse::<KlinePeriod>().is_err());
        assert_eq!(KlinePeriod::OneHour.to_string(), "60min");
    }
}
