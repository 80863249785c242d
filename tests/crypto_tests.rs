//! Integration tests for the CarePortal crypto module.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use careportal::crypto::keys::{derive_field_key, SealingKey, FIELD_CREDENTIALS, FIELD_PAYMENT};
use careportal::crypto::{
    derive_sealing_key, envelope, secure_compare, sha256_hex, KdfParams, APP_SALT,
};
use careportal::errors::CarePortalError;

// ---------------------------------------------------------------------------
// Envelope round-trip
// ---------------------------------------------------------------------------

#[test]
fn seal_open_roundtrip_string() {
    let key = [0xABu8; 32];
    let value = "P@ssw0rd1";

    let sealed = envelope::seal(&key, &value).expect("seal should succeed");
    let recovered: String = envelope::open(&key, &sealed).expect("open should succeed");

    assert_eq!(recovered, value);
}

#[test]
fn seal_open_roundtrip_number() {
    let key = [0xABu8; 32];

    let sealed = envelope::seal(&key, &42_u64).expect("seal");
    let recovered: u64 = envelope::open(&key, &sealed).expect("open");

    assert_eq!(recovered, 42);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct CardFields {
    number: String,
    cvv: String,
    expiry: String,
}

#[test]
fn seal_open_roundtrip_object() {
    let key = [0x33u8; 32];
    let fields = CardFields {
        number: "4111111111111111".to_string(),
        cvv: "123".to_string(),
        expiry: "12/26".to_string(),
    };

    let sealed = envelope::seal(&key, &fields).expect("seal");
    let recovered: CardFields = envelope::open(&key, &sealed).expect("open");

    assert_eq!(recovered, fields);
}

#[test]
fn seal_produces_different_envelopes_each_time() {
    let key = [0xCDu8; 32];
    let value = "same-secret";

    let sealed1 = envelope::seal(&key, &value).expect("seal 1");
    let sealed2 = envelope::seal(&key, &value).expect("seal 2");

    // Because each call generates a new random nonce, the output must differ.
    assert_ne!(sealed1, sealed2, "two sealings of the same value must differ");

    // Both still open to the identical value.
    let v1: String = envelope::open(&key, &sealed1).expect("open 1");
    let v2: String = envelope::open(&key, &sealed2).expect("open 2");
    assert_eq!(v1, v2);
}

#[test]
fn open_with_wrong_key_fails() {
    let key = [0x11u8; 32];
    let wrong_key = [0x22u8; 32];

    let sealed = envelope::seal(&key, &"top secret").expect("seal");
    let result: Result<String, _> = envelope::open(&wrong_key, &sealed);

    assert!(matches!(result, Err(CarePortalError::DecryptFailed)));
}

#[test]
fn open_rejects_malformed_input() {
    let key = [0xAAu8; 32];

    // Not base64 at all.
    let result: Result<String, _> = envelope::open(&key, "definitely not an envelope!!!");
    assert!(matches!(result, Err(CarePortalError::DecryptFailed)));

    // Valid base64, but shorter than a nonce.
    let short = BASE64.encode([0u8; 5]);
    let result: Result<String, _> = envelope::open(&key, &short);
    assert!(matches!(result, Err(CarePortalError::DecryptFailed)));

    // Empty string.
    let result: Result<String, _> = envelope::open(&key, "");
    assert!(matches!(result, Err(CarePortalError::DecryptFailed)));
}

#[test]
fn open_detects_any_flipped_byte() {
    let key = [0xBBu8; 32];
    let sealed = envelope::seal(&key, &"tamper me").expect("seal");

    let bytes = BASE64.decode(&sealed).expect("sealed output is base64");
    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        let result: Result<String, _> = envelope::open(&key, &BASE64.encode(&tampered));
        assert!(
            matches!(result, Err(CarePortalError::DecryptFailed)),
            "flipping byte {i} must fail authentication"
        );
    }
}

#[test]
fn open_detects_tampered_envelope_string() {
    let key = [0xBCu8; 32];
    let sealed = envelope::seal(&key, &"tamper me").expect("seal");

    // Swap the first character of the base64 string for a different one.
    let replacement = if sealed.starts_with('A') { 'B' } else { 'A' };
    let tampered: String = std::iter::once(replacement)
        .chain(sealed.chars().skip(1))
        .collect();

    let result: Result<String, _> = envelope::open(&key, &tampered);
    assert!(matches!(result, Err(CarePortalError::DecryptFailed)));
}

// ---------------------------------------------------------------------------
// Key derivation (Argon2id)
// ---------------------------------------------------------------------------

/// Low-cost parameters so the KDF tests stay fast.
fn test_params() -> KdfParams {
    KdfParams {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

#[test]
fn derive_sealing_key_same_inputs_same_output() {
    let secret = b"shared-transport-secret";

    let key1 = careportal::crypto::derive_sealing_key_with_params(secret, APP_SALT, &test_params())
        .expect("derive 1");
    let key2 = careportal::crypto::derive_sealing_key_with_params(secret, APP_SALT, &test_params())
        .expect("derive 2");

    assert_eq!(key1, key2, "same secret + salt must produce the same key");
}

#[test]
fn derive_sealing_key_different_secrets_different_keys() {
    let key1 = careportal::crypto::derive_sealing_key_with_params(
        b"secret-one",
        APP_SALT,
        &test_params(),
    )
    .expect("derive 1");
    let key2 = careportal::crypto::derive_sealing_key_with_params(
        b"secret-two",
        APP_SALT,
        &test_params(),
    )
    .expect("derive 2");

    assert_ne!(key1, key2, "different secrets must produce different keys");
}

#[test]
fn derive_sealing_key_rejects_weak_params() {
    let weak = KdfParams {
        memory_kib: 1_024,
        iterations: 1,
        parallelism: 1,
    };
    let result = careportal::crypto::derive_sealing_key_with_params(b"secret", APP_SALT, &weak);
    assert!(result.is_err(), "sub-minimum memory cost must be rejected");
}

#[test]
fn derive_sealing_key_uses_default_params() {
    // The default-params path must agree with the explicit-params path.
    let via_default = derive_sealing_key(b"secret", APP_SALT).expect("default derive");
    let via_explicit = careportal::crypto::derive_sealing_key_with_params(
        b"secret",
        APP_SALT,
        &KdfParams::default(),
    )
    .expect("explicit derive");
    assert_eq!(via_default, via_explicit);
}

// ---------------------------------------------------------------------------
// HKDF field-key derivation
// ---------------------------------------------------------------------------

#[test]
fn field_keys_differ_by_purpose() {
    let sealing = [0x99u8; 32];

    let credentials = derive_field_key(&sealing, FIELD_CREDENTIALS).expect("derive credentials");
    let payment = derive_field_key(&sealing, FIELD_PAYMENT).expect("derive payment");

    assert_ne!(
        credentials, payment,
        "different purposes must produce different keys"
    );
}

#[test]
fn field_key_same_purpose_same_key() {
    let sealing = [0x77u8; 32];

    let key1 = derive_field_key(&sealing, FIELD_PAYMENT).expect("derive 1");
    let key2 = derive_field_key(&sealing, FIELD_PAYMENT).expect("derive 2");

    assert_eq!(key1, key2, "same inputs must produce the same key");
}

#[test]
fn sealing_key_wrapper_derives_field_keys() {
    let raw = [0x44u8; 32];
    let sealing = SealingKey::new(raw);

    // Derive through the wrapper and through the free function — must match.
    let via_wrapper = sealing
        .derive_field_key(FIELD_CREDENTIALS)
        .expect("wrapper derive");
    let via_fn = derive_field_key(&raw, FIELD_CREDENTIALS).expect("fn derive");
    assert_eq!(via_wrapper, via_fn);
}

// ---------------------------------------------------------------------------
// Digest and constant-time comparison
// ---------------------------------------------------------------------------

#[test]
fn sha256_hex_matches_known_vectors() {
    assert_eq!(
        sha256_hex("P@ssw0rd1"),
        "f7745f4df4394027716de160fb2acd6aac36699576a8be586b75ac09acf6a0df"
    );
    assert_eq!(
        sha256_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(
        sha256_hex(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn sha256_hex_is_stable_and_discriminating() {
    assert_eq!(sha256_hex("hunter2"), sha256_hex("hunter2"));
    assert_ne!(sha256_hex("hunter2"), sha256_hex("hunter3"));
}

#[test]
fn secure_compare_truth_table() {
    assert!(secure_compare("abc", "abc"));
    assert!(!secure_compare("abc", "abd"));
    assert!(!secure_compare("abc", "ab"));
    assert!(!secure_compare("", "a"));
    assert!(secure_compare("", ""));
}

/// Statistical timing check: the comparison time must not depend on
/// the position of the first mismatching byte.  Scheduler noise makes
/// this unreliable on shared CI runners, so it is ignored by default.
#[test]
#[ignore = "statistical timing check — run manually"]
fn secure_compare_timing_is_position_independent() {
    use std::time::Instant;

    let reference = "a".repeat(4096);

    let mut early = reference.clone().into_bytes();
    early[0] = b'b';
    let early = String::from_utf8(early).unwrap();

    let mut late = reference.clone().into_bytes();
    let last = late.len() - 1;
    late[last] = b'b';
    let late = String::from_utf8(late).unwrap();

    const ROUNDS: u32 = 20_000;
    let time = |candidate: &str| {
        let start = Instant::now();
        for _ in 0..ROUNDS {
            std::hint::black_box(secure_compare(
                std::hint::black_box(&reference),
                std::hint::black_box(candidate),
            ));
        }
        start.elapsed().as_secs_f64()
    };

    // Warm up, then measure.
    time(&early);
    time(&late);
    let early_t = time(&early);
    let late_t = time(&late);

    let ratio = early_t.max(late_t) / early_t.min(late_t);
    assert!(
        ratio < 1.2,
        "timing varied with mismatch position: ratio {ratio:.3}"
    );
}

// ---------------------------------------------------------------------------
// End-to-end: root secret -> sealing key -> field key -> seal/open
// ---------------------------------------------------------------------------

#[test]
fn full_crypto_pipeline() {
    let secret = b"provisioned-on-both-ends";

    // Step 1: Stretch the root secret into a sealing key.
    let sealing = SealingKey::from_secret_with_params(secret, &test_params()).expect("stretch");

    // Step 2: Derive the purpose-scoped field key.
    let field_key = sealing
        .derive_field_key(FIELD_CREDENTIALS)
        .expect("field key");

    // Step 3: Seal a value on the "client" side.
    let sealed = envelope::seal(&field_key, &"P@ssw0rd1").expect("seal");

    // Step 4: The "server" side derives the same keys and opens it.
    let server_sealing =
        SealingKey::from_secret_with_params(secret, &test_params()).expect("server stretch");
    let server_key = server_sealing
        .derive_field_key(FIELD_CREDENTIALS)
        .expect("server field key");
    let recovered: String = envelope::open(&server_key, &sealed).expect("open");

    assert_eq!(recovered, "P@ssw0rd1");
}
