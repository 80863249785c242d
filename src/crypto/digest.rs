//! One-way digests and constant-time comparison.
//!
//! Passwords are never stored in a reversible form: the handler side
//! hashes the recovered plaintext and persists only the digest.  The
//! digest is the lowercase-hex SHA-256 of the input — stable across
//! calls, keyless, and never used as a transport envelope.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the lowercase-hex SHA-256 digest of `value`.
pub fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
}

/// Compare two strings in time independent of where they first differ.
///
/// Equal-length inputs are scanned in full with no early exit.
/// Unequal lengths return false immediately — length itself is not
/// secret-sensitive for the digests and tokens compared here.
pub fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
