//! Domain layer - canonical trading shapes and pure policy.
//!
//! No I/O happens here. Venue adapters map their payloads into these
//! types; use cases consume them.

pub mod command;
pub mod failure;
pub mod market;
pub mod order;
pub mod order_policy;

pub use command::ControlCommand;
pub use failure::{FailureCategory, FailureEvent, FailureTracker};
pub use market::{
    Balance, BalanceMap, Candle, Kline, KlinePeriod, PriceSource, SymbolDetails, SymbolTable,
    Ticker,
};
pub use order::{
    CancelAck, CancelAllAck, Order, OrderRef, OrderRequest, OrderStatus, OrderType,
    PreparedOrder, Side, TimeInForce,
};
