//! OS keyring storage for the device key.
//!
//! An alternative home for the per-installation key in the operating
//! system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully — if the keyring is unavailable, the
//! error is returned and the caller falls back to the file-backed
//! `DeviceKeyStore`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::crypto::DEVICE_KEY_LEN;
use crate::errors::{CarePortalError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "careportal";

/// Build a keyring entry key for an installation.
fn entry_key(install_id: &str) -> String {
    format!("device-key:{install_id}")
}

/// Store the device key in the OS keyring, base64-encoded.
pub fn store_device_key(install_id: &str, key: &[u8]) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(install_id))
        .map_err(|e| CarePortalError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    entry.set_password(&BASE64.encode(key)).map_err(|e| {
        CarePortalError::KeyringError(format!("failed to store device key in keyring: {e}"))
    })?;

    Ok(())
}

/// Retrieve the device key from the OS keyring.
///
/// Returns `None` if no key is stored (rather than an error).
pub fn get_device_key(install_id: &str) -> Result<Option<Vec<u8>>> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(install_id))
        .map_err(|e| CarePortalError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.get_password() {
        Ok(encoded) => {
            let key = BASE64.decode(&encoded).map_err(|e| {
                CarePortalError::KeyringError(format!("stored device key is not valid base64: {e}"))
            })?;
            if key.len() != DEVICE_KEY_LEN {
                return Err(CarePortalError::KeyringError(format!(
                    "stored device key must be {DEVICE_KEY_LEN} bytes, got {}",
                    key.len()
                )));
            }
            Ok(Some(key))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(CarePortalError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete the stored device key from the OS keyring.
pub fn delete_device_key(install_id: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(install_id))
        .map_err(|e| CarePortalError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
        Err(e) => Err(CarePortalError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
