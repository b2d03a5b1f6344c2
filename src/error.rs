//! Error taxonomy.
//!
//! - [`ExchangeError`]: outcome of a trading contract call. Transport
//!   failures are already counted by the circuit breaker when a caller
//!   sees them; the other variants are caller-side problems.
//! - [`TransportError`]: raw venue transport failures, internal to adapters.
//! - [`BootstrapError`]: fatal construction failures, never retried.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned by every canonical trading operation.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network, timeout, HTTP status, venue error envelope or undecodable
    /// payload. The outcome of the operation is unknown.
    #[error("{operation} failed in transport: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The placement policy refused to dispatch the order.
    #[error("order for {symbol} below venue minimum: {reason}")]
    BelowMinimum { symbol: String, reason: String },

    /// Symbol not present in the adapter's metadata table.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The caller broke the operation's contract.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ExchangeError {
    /// True when the venue outcome is unknown (as opposed to a local refusal).
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// True for caller programming errors.
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::UnknownSymbol(_) | Self::InvalidRequest(_))
    }
}

/// Failure inside a venue transport call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("venue error {code}: {message}")]
    Envelope { code: String, message: String },

    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether retrying an idempotent request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Envelope { .. } | Self::Decode(_) => false,
        }
    }
}

/// Fatal error while building an adapter.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("credential file {path} unreadable: {source}")]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file {path} malformed: {source}")]
    CredentialsMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported venue: {0}")]
    UnsupportedVenue(String),

    #[error("credential path {path} already bound to venue {existing}, requested {requested}")]
    IdentityConflict {
        path: PathBuf,
        existing: String,
        requested: String,
    },

    #[error("no {account_type} account found on {venue}")]
    AccountNotFound { venue: String, account_type: String },

    #[error("account lookup on {venue} failed: {message}")]
    AccountLookup { venue: String, message: String },

    #[error("symbol metadata unavailable from {venue}: {message}")]
    SymbolMetadata { venue: String, message: String },

    #[error("invalid venue endpoint {0}")]
    Endpoint(String),

    #[error("http client construction failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let t = ExchangeError::Transport {
            operation: "get_ticker",
            message: "boom".into(),
        };
        assert!(t.is_transport());
        assert!(!t.is_contract_violation());
        assert!(ExchangeError::InvalidRequest("x".into()).is_contract_violation());
        assert!(ExchangeError::UnknownSymbol("X".into()).is_contract_violation());
        let below = ExchangeError::BelowMinimum {
            symbol: "X".into(),
            reason: "small".into(),
        };
        assert!(!below.is_transport() && !below.is_contract_violation());
    }

    #[test]
    fn test_transient_statuses() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::Status { status: 503, body: String::new() }.is_transient());
        assert!(TransportError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!TransportError::Status { status: 400, body: String::new() }.is_transient());
        assert!(
            !TransportError::Envelope {
                code: "bad".into(),
                message: "nope".into()
            }
            .is_transient()
        );
    }
}
