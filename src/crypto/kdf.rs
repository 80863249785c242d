//! Sealing-key derivation using Argon2id.
//!
//! A root secret (the per-device key, or the shared transport secret
//! both ends of the wire are provisioned with) is stretched into the
//! 256-bit sealing key that actually drives the cipher.  The derived
//! key is recomputed on demand and never persisted.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::TryRngCore;

use crate::errors::{CarePortalError, Result};

/// Fixed application-wide salt for sealing-key derivation.
///
/// Every installation uses the same salt, so the same root secret
/// always stretches to the same sealing key — that symmetry is what
/// lets the handler side open envelopes sealed by a client holding the
/// same secret.
pub const APP_SALT: &[u8; 16] = b"careportal-kdf-1";

/// Length of the derived sealing key in bytes (256 bits, for AES-256).
const KEY_LEN: usize = 32;

/// Length of a generated root key in bytes (256 bits).
pub const ROOT_KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
///
/// Derivation happens once per request, so the defaults sit at the
/// low-latency end of the recommended range (19 MB, 2 iterations, one
/// lane) rather than the vault-grade settings a long-lived store would
/// use.  These map 1:1 to the fields in `Settings`.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 19 456 = 19 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 2).
    pub iterations: u32,
    /// Parallelism lanes (default: 1).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Derive a 32-byte sealing key from a root secret and salt.
///
/// Uses the default Argon2id parameters.  Prefer
/// `derive_sealing_key_with_params` when you have a `Settings`.
pub fn derive_sealing_key(root_secret: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    derive_sealing_key_with_params(root_secret, salt, &KdfParams::default())
}

/// Derive a 32-byte sealing key with explicit Argon2id parameters.
///
/// The same secret + salt + params will always produce the same key.
/// Enforces minimum parameters to prevent dangerously weak KDF settings.
pub fn derive_sealing_key_with_params(
    root_secret: &[u8],
    salt: &[u8],
    kdf_params: &KdfParams,
) -> Result<[u8; KEY_LEN]> {
    if kdf_params.memory_kib < MIN_MEMORY_KIB {
        return Err(CarePortalError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            kdf_params.memory_kib
        )));
    }
    if kdf_params.iterations < 1 {
        return Err(CarePortalError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if kdf_params.parallelism < 1 {
        return Err(CarePortalError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        kdf_params.memory_kib,
        kdf_params.iterations,
        kdf_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CarePortalError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(root_secret, salt, &mut key)
        .map_err(|e| {
            CarePortalError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte root key.
///
/// Fails with `KeyGenerationFailed` if the OS random source is
/// unavailable — callers must never proceed with an unkeyed envelope.
pub fn generate_root_key() -> Result<[u8; ROOT_KEY_LEN]> {
    let mut key = [0u8; ROOT_KEY_LEN];
    rand::rngs::OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| CarePortalError::KeyGenerationFailed(e.to_string()))?;
    Ok(key)
}
