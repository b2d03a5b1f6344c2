//! Order Path Benchmarks
//!
//! Benchmarks the pure functions on every placement and every order
//! fetch: the size/price policy and order canonicalization.
//!
//! Run with: cargo bench --bench order_policy_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use gridline::adapters::huobi::exchange::canonical_order;
use gridline::adapters::huobi::types::HuobiOrder;
use gridline::domain::market::{Candle, PriceSource, SymbolDetails, moving_average};
use gridline::domain::order::{OrderRequest, Side};
use gridline::domain::order_policy;

fn btcusdt() -> SymbolDetails {
    SymbolDetails::new("btcusdt", "btc", "usdt", 2, 6, dec!(0.0001), dec!(5))
}

/// Benchmark the full placement policy for a buy and a sell.
fn bench_prepare(c: &mut Criterion) {
    let details = btcusdt();
    let buy = OrderRequest::limit("btcusdt", Side::Buy, dec!(0.123456789), dec!(30000.004));
    let sell = OrderRequest::limit("btcusdt", Side::Sell, dec!(0.5), dec!(30100.006));

    c.bench_function("order_policy_prepare_buy", |b| {
        b.iter(|| order_policy::prepare(black_box(&details), black_box(buy.clone())));
    });
    c.bench_function("order_policy_prepare_sell", |b| {
        b.iter(|| order_policy::prepare(black_box(&details), black_box(sell.clone())));
    });
}

/// Benchmark decoding and canonicalizing one venue order payload.
fn bench_canonical_order(c: &mut Criterion) {
    let payload = r#"{
        "id": 59378, "symbol": "btcusdt", "account-id": 100009,
        "client-order-id": "4f1c9a2e", "amount": "0.100000",
        "price": "29999.99", "created-at": 1700000000000,
        "type": "buy-limit", "field-amount": "0.05",
        "field-cash-amount": "1499.9995", "finished-at": 0,
        "state": "partial-filled"
    }"#;

    c.bench_function("huobi_canonical_order", |b| {
        b.iter(|| {
            let raw: HuobiOrder = serde_json::from_str(black_box(payload)).unwrap();
            canonical_order(raw).unwrap()
        });
    });
}

/// Benchmark the moving average over a typical strategy window.
fn bench_moving_average(c: &mut Criterion) {
    let kline: Vec<Candle> = (0..200)
        .map(|i| {
            let close = dec!(30000) + rust_decimal::Decimal::from(i % 17);
            Candle {
                timestamp_sec: i64::from(i) * 60,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1.5),
            }
        })
        .collect();

    c.bench_function("moving_average_200", |b| {
        b.iter(|| moving_average(black_box(&kline), PriceSource::Close));
    });
}

criterion_group!(
    benches,
    bench_prepare,
    bench_canonical_order,
    bench_moving_average,
);
criterion_main!(benches);
