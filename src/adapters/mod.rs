//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, HTTP servers).
//!
//! Adapter categories:
//! - `huobi`: Huobi spot REST venue (signing, transport, canonicalization)
//! - `credentials`: JSON key file loading
//! - `registry`: venue selection and adapter memoization
//! - `command_file`: shutdown directive side channel
//! - `metrics`: Prometheus metrics export and health checks

pub mod command_file;
pub mod credentials;
pub mod huobi;
pub mod metrics;
pub mod registry;

pub use command_file::CommandFile;
pub use registry::ExchangeRegistry;
