//! Cryptographic primitives for the CarePortal core.
//!
//! This module provides:
//! - AES-256-GCM envelope sealing for sensitive fields (`envelope`)
//! - Argon2id sealing-key derivation (`kdf`)
//! - HKDF-based per-purpose field keys (`keys`)
//! - Per-installation device key storage (`device_key`)
//! - Password digests and constant-time comparison (`digest`)

pub mod device_key;
pub mod digest;
pub mod envelope;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use careportal::crypto::{seal, open, sha256_hex, ...};
pub use device_key::{DeviceKeyStore, DEVICE_KEY_LEN};
pub use digest::{secure_compare, sha256_hex};
pub use envelope::{open, seal};
pub use kdf::{derive_sealing_key, derive_sealing_key_with_params, KdfParams, APP_SALT};
pub use keys::{derive_field_key, SealingKey, FIELD_CREDENTIALS, FIELD_PAYMENT};
