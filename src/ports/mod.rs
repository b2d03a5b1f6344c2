//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Traits the use cases depend on. Adapters implement them.
//!
//! Port categories:
//! - `ExchangeApi` / `VenueConnector`: canonical trading contract and
//!   adapter construction
//! - `FailureSink`: failure reporting into the circuit breaker
//! - `CommandChannel`: shutdown directive side channel

pub mod control;
pub mod exchange;
pub mod failure;

pub use control::CommandChannel;
pub use exchange::{ConnectRequest, Credentials, ExchangeApi, VenueConnector};
pub use failure::FailureSink;
