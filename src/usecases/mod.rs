//! Use Cases Layer - Application Orchestration
//!
//! Drives the canonical trading contract and guards the process.
//!
//! Use cases:
//! - `Worker`: periodic task runner with pause/resume and error backoff
//! - `CircuitBreaker`: failure-rate trackers and the shutdown trigger
//! - `CommandProcessor`: control channel polling
//! - `GridStrategy`: moving-average band quoting
//! - `TradeSystem`: runner ownership and teardown order

pub mod circuit_breaker;
pub mod command_processor;
pub mod grid_strategy;
pub mod trade_system;
pub mod worker;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use command_processor::CommandProcessor;
pub use grid_strategy::GridStrategy;
pub use trade_system::TradeSystem;
pub use worker::{PeriodicJob, Worker, WorkerSettings, WorkerState};
