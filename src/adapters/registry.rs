//! Adapter Registry - One Live Adapter per Credential Identity
//!
//! Selects the venue connector by name, reads the credential file and
//! memoizes the constructed adapter by credential path. Construction
//! failures propagate to the bootstrapper and are never retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::credentials::load_credentials;
use crate::error::BootstrapError;
use crate::ports::exchange::{ConnectRequest, ExchangeApi, VenueConnector};
use crate::ports::failure::FailureSink;

struct CachedAdapter {
    venue: String,
    api: Arc<dyn ExchangeApi>,
}

/// Venue connectors plus the adapter cache.
pub struct ExchangeRegistry {
    /// Connectors keyed by lowercase venue name.
    connectors: HashMap<String, Arc<dyn VenueConnector>>,
    /// Failure intake handed to every transport.
    failures: Arc<dyn FailureSink>,
    /// Held across construction so concurrent resolves build once.
    adapters: Mutex<HashMap<PathBuf, CachedAdapter>>,
}

impl ExchangeRegistry {
    pub fn new(failures: Arc<dyn FailureSink>) -> Self {
        Self {
            connectors: HashMap::new(),
            failures,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Register a connector under its venue name.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn VenueConnector>) -> Self {
        self.connectors
            .insert(connector.venue().to_lowercase(), connector);
        self
    }

    /// Return the adapter bound to `credential_path`, building it on first use.
    ///
    /// # Errors
    /// - `UnsupportedVenue` when no connector serves `venue`
    /// - `IdentityConflict` when the path is already bound to another venue
    /// - any credential or construction failure from the connector
    #[instrument(skip(self), fields(path = %credential_path.display()))]
    pub async fn resolve(
        &self,
        venue: &str,
        symbol: &str,
        credential_path: &Path,
    ) -> Result<Arc<dyn ExchangeApi>, BootstrapError> {
        let venue = venue.to_lowercase();
        let mut adapters = self.adapters.lock().await;

        if let Some(cached) = adapters.get(credential_path) {
            if cached.venue != venue {
                return Err(BootstrapError::IdentityConflict {
                    path: credential_path.to_path_buf(),
                    existing: cached.venue.clone(),
                    requested: venue,
                });
            }
            return Ok(Arc::clone(&cached.api));
        }

        let connector = self
            .connectors
            .get(&venue)
            .ok_or_else(|| BootstrapError::UnsupportedVenue(venue.clone()))?;
        let credentials = load_credentials(credential_path).await?;

        let api = connector
            .connect(ConnectRequest {
                name: &venue,
                symbol,
                credentials,
                failures: Arc::clone(&self.failures),
            })
            .await?;

        info!(venue = %venue, symbol, "Adapter constructed");
        adapters.insert(
            credential_path.to_path_buf(),
            CachedAdapter {
                venue,
                api: Arc::clone(&api),
            },
        );
        Ok(api)
    }

    /// Number of live adapters.
    pub async fn len(&self) -> usize {
        self.adapters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
