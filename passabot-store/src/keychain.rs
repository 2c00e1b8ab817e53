//! SPID password storage.
//!
//! The password lives under the `spid` service with the SPID username as
//! the account, so several identities can coexist on one machine.

use passabot_fetch::KeychainApi;
use passabot_fetch::host::keychain::services;
use tracing::debug;

use crate::error::StoreError;

/// Looks up the SPID password for `username`.
pub async fn spid_password(
    keychain: &dyn KeychainApi,
    username: &str,
) -> Result<Option<String>, StoreError> {
    debug!(account = %username, "Looking up SPID password");
    Ok(keychain.get(services::SPID, username).await?)
}

/// Stores the SPID password for `username`.
pub async fn store_spid_password(
    keychain: &dyn KeychainApi,
    username: &str,
    password: &str,
) -> Result<(), StoreError> {
    if password.is_empty() {
        return Err(StoreError::Config("password must not be empty".to_string()));
    }
    keychain.set(services::SPID, username, password).await?;
    debug!(account = %username, "Stored SPID password");
    Ok(())
}

/// Removes the SPID password for `username`.
pub async fn delete_spid_password(
    keychain: &dyn KeychainApi,
    username: &str,
) -> Result<(), StoreError> {
    keychain.delete(services::SPID, username).await?;
    Ok(())
}
