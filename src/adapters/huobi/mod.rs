//! Huobi spot venue adapter.
//!
//! - `auth`: HMAC-SHA256 request signing
//! - `client`: signed REST transport with the failure boundary
//! - `types`: wire payloads
//! - `exchange`: `ExchangeApi` implementation and its connector

pub mod auth;
pub mod client;
pub mod exchange;
pub mod types;

pub use client::{DEFAULT_BASE_URL, HuobiRest, RestConfig};
pub use exchange::{HuobiConnector, HuobiExchange, VENUE};
