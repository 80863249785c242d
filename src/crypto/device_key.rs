//! Per-installation device key storage.
//!
//! The device key is a 32-byte random secret created lazily on first
//! use and persisted for the lifetime of the installation.  It never
//! leaves the device: it is the root secret for protecting data at
//! rest on the device, while transport envelopes are sealed under the
//! shared transport secret from `Settings`.
//!
//! The first-use path must be idempotent under concurrency: two
//! near-simultaneous callers converge on one persisted key.  We get
//! that from the filesystem — the key is written to a private temp
//! file and published with `hard_link`, which is an atomic
//! create-if-absent.  A caller that loses the race reads the winner's
//! key; the file is always complete by the time it is visible.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use zeroize::Zeroize;

use crate::crypto::kdf;
use crate::errors::{CarePortalError, Result};

/// Expected length of the device key in bytes (256 bits).
pub const DEVICE_KEY_LEN: usize = kdf::ROOT_KEY_LEN;

/// File name of the persisted key inside the data directory.
const KEY_FILE_NAME: &str = "device.key";

/// Sequence counter for unique temp-file names within one process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed store for the per-installation device key.
pub struct DeviceKeyStore {
    path: PathBuf,
}

impl DeviceKeyStore {
    /// Create a store rooted at `data_dir` (e.g. `.careportal/`).
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(KEY_FILE_NAME),
        }
    }

    /// Path of the key file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the device key, generating and persisting it on first use.
    ///
    /// Repeated calls return the same key until `clear` removes it.
    /// Storage failure is fatal for the caller — an envelope must never
    /// be sealed with an unkeyed cipher.
    pub fn get_or_create(&self) -> Result<Vec<u8>> {
        match self.read()? {
            Some(key) => Ok(key),
            None => self.create(),
        }
    }

    /// Remove the persisted key (logout / uninstall path).
    ///
    /// A missing key is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_err(e)),
        }
    }

    /// Read the key file if present, validating its length.
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.len() == DEVICE_KEY_LEN => Ok(Some(bytes)),
            Ok(mut bytes) => {
                bytes.zeroize();
                Err(CarePortalError::MalformedDeviceKey(self.path.clone()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.storage_err(e)),
        }
    }

    /// Generate a fresh key and publish it with create-if-absent
    /// semantics.  Losing the race means another caller already
    /// persisted a key — read and use that one instead of overwriting.
    fn create(&self) -> Result<Vec<u8>> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| self.storage_err(e))?;
        }

        let mut key = kdf::generate_root_key()?;

        // Write the full key to a private temp file first so the real
        // path only ever holds a complete key.
        let tmp_path = parent.join(format!(
            ".{}.{}.{}",
            KEY_FILE_NAME,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        // hard_link is atomic create-if-absent: exactly one concurrent
        // caller publishes its key, everyone else gets AlreadyExists.
        let result = self.write_private(&tmp_path, &key).and_then(|()| {
            match fs::hard_link(&tmp_path, &self.path) {
                Ok(()) => Ok(key.to_vec()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => match self.read() {
                    Ok(Some(existing)) => Ok(existing),
                    Ok(None) => Err(CarePortalError::MalformedDeviceKey(self.path.clone())),
                    Err(err) => Err(err),
                },
                Err(e) => Err(self.storage_err(e)),
            }
        });

        key.zeroize();
        let _ = fs::remove_file(&tmp_path);
        result
    }

    /// Write `key` to `path` with owner-only permissions.
    fn write_private(&self, path: &Path, key: &[u8]) -> Result<()> {
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }

        let mut file = opts.open(path).map_err(|e| self.storage_err(e))?;
        file.write_all(key).map_err(|e| self.storage_err(e))?;
        file.sync_all().map_err(|e| self.storage_err(e))?;
        Ok(())
    }

    fn storage_err(&self, source: std::io::Error) -> CarePortalError {
        CarePortalError::StorageUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}
