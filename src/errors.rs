use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in the CarePortal core.
#[derive(Debug, Error)]
pub enum CarePortalError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or corrupted envelope")]
    DecryptFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Key generation failed — secure random source unavailable: {0}")]
    KeyGenerationFailed(String),

    // --- Device key storage ---
    #[error("Device key storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Device key at {0} is malformed — expected 32 bytes")]
    MalformedDeviceKey(PathBuf),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Transport secret is not configured — set CAREPORTAL_TRANSPORT_SECRET or add `transport_secret` to .careportal.toml")]
    TransportSecretMissing,

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Audit errors ---
    #[error("Audit error: {0}")]
    AuditError(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for CarePortal results.
pub type Result<T> = std::result::Result<T, CarePortalError>;
