//! Integration tests for device key storage.

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use careportal::crypto::{DeviceKeyStore, DEVICE_KEY_LEN};
use careportal::errors::CarePortalError;

#[test]
fn first_use_generates_and_persists_a_key() {
    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());

    let key = store.get_or_create().unwrap();
    assert_eq!(key.len(), DEVICE_KEY_LEN);
    assert!(store.path().exists(), "key file must be persisted");
}

#[test]
fn repeated_calls_return_the_same_key() {
    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());

    let first = store.get_or_create().unwrap();
    let second = store.get_or_create().unwrap();
    assert_eq!(first, second, "key must be stable across calls");
}

#[test]
fn key_survives_a_new_store_instance() {
    let dir = TempDir::new().unwrap();

    let first = DeviceKeyStore::new(dir.path()).get_or_create().unwrap();
    // A fresh handle over the same directory — simulates an app restart.
    let second = DeviceKeyStore::new(dir.path()).get_or_create().unwrap();
    assert_eq!(first, second);
}

#[test]
fn concurrent_first_use_converges_on_one_key() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DeviceKeyStore::new(dir.path()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get_or_create().unwrap())
        })
        .collect();

    let keys: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Every caller must observe the single persisted key.
    let persisted = fs::read(store.path()).unwrap();
    for key in &keys {
        assert_eq!(key, &persisted, "all callers must converge on one key");
    }
}

#[test]
fn clear_removes_the_key() {
    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());

    let first = store.get_or_create().unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());

    // A new key is generated on the next use.
    let second = store.get_or_create().unwrap();
    assert_ne!(first, second, "a cleared installation gets a fresh key");
}

#[test]
fn clear_is_a_noop_when_no_key_exists() {
    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());
    assert!(store.clear().is_ok());
}

#[test]
fn malformed_key_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());

    fs::write(store.path(), [0u8; 7]).unwrap();

    let result = store.get_or_create();
    assert!(matches!(
        result,
        Err(CarePortalError::MalformedDeviceKey(_))
    ));
}

#[cfg(unix)]
#[test]
fn key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = DeviceKeyStore::new(dir.path());
    store.get_or_create().unwrap();

    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600, "key file must be owner-only");
}
