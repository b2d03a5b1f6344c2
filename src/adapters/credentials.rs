//! Credential File Loader
//!
//! Reads the JSON key file (`key`, `secret`, optional `account_type`)
//! once, at adapter construction. Any problem here aborts startup.

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::BootstrapError;
use crate::ports::exchange::Credentials;

/// Read and parse a credential file.
///
/// # Errors
/// `CredentialsUnreadable` when the file is missing or unreadable,
/// `CredentialsMalformed` when it is not the expected JSON object.
pub async fn load_credentials(path: &Path) -> Result<Credentials, BootstrapError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::CredentialsUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let credentials: Credentials =
        serde_json::from_str(&raw).map_err(|source| BootstrapError::CredentialsMalformed {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), key = %credentials.key, "Credentials loaded");
    Ok(credentials)
}
