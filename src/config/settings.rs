use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CarePortalError, Result};

/// Deployment-level configuration, loaded from `.careportal.toml`.
///
/// Every field has a sensible default so the core works out-of-the-box
/// without any config file at all.  The transport secret is the one
/// exception: it has no default and must be provisioned via the
/// environment or the config file before transport envelopes can be
/// opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory where device-local state lives (device key, audit db).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Shared transport secret; `CAREPORTAL_TRANSPORT_SECRET` overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_secret: Option<String>,

    /// Argon2 memory cost in KiB (default: 19 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 2).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 1).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".careportal".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    19_456 // 19 MB
}

fn default_argon2_iterations() -> u32 {
    2
}

fn default_argon2_parallelism() -> u32 {
    1
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            transport_secret: None,
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the deployment root.
    const FILE_NAME: &'static str = ".careportal.toml";

    /// Environment variable that overrides the configured secret.
    pub const TRANSPORT_SECRET_ENV: &'static str = "CAREPORTAL_TRANSPORT_SECRET";

    /// Load settings from `<root_dir>/.careportal.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(root_dir: &Path) -> Result<Self> {
        let config_path = root_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CarePortalError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Build the full path of the data directory.
    ///
    /// Example: `root_dir/.careportal`
    pub fn data_path(&self, root_dir: &Path) -> PathBuf {
        root_dir.join(&self.data_dir)
    }

    /// Resolve the shared transport secret.
    ///
    /// The environment variable wins over the config file so operators
    /// can rotate the secret without touching deployed config.
    pub fn resolve_transport_secret(&self) -> Result<String> {
        if let Ok(secret) = std::env::var(Self::TRANSPORT_SECRET_ENV) {
            if !secret.is_empty() {
                return Ok(secret);
            }
        }

        self.transport_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(CarePortalError::TransportSecretMissing)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn kdf_params(&self) -> crate::crypto::kdf::KdfParams {
        crate::crypto::kdf::KdfParams {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.data_dir, ".careportal");
        assert!(s.transport_secret.is_none());
        assert_eq!(s.argon2_memory_kib, 19_456);
        assert_eq!(s.argon2_iterations, 2);
        assert_eq!(s.argon2_parallelism, 1);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, ".careportal");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
data_dir = "state"
transport_secret = "wire-secret"
argon2_memory_kib = 65536
argon2_iterations = 3
argon2_parallelism = 4
"#;
        fs::write(tmp.path().join(".careportal.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, "state");
        assert_eq!(settings.transport_secret.as_deref(), Some("wire-secret"));
        assert_eq!(settings.argon2_memory_kib, 65_536);
        assert_eq!(settings.argon2_iterations, 3);
        assert_eq!(settings.argon2_parallelism, 4);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let config = "data_dir = \"elsewhere\"\n";
        fs::write(tmp.path().join(".careportal.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, "elsewhere");
        // Rest should be defaults
        assert_eq!(settings.argon2_iterations, 2);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".careportal.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn missing_transport_secret_is_an_error() {
        let s = Settings::default();
        // The env var is not set in the test environment.
        if std::env::var(Settings::TRANSPORT_SECRET_ENV).is_err() {
            assert!(s.resolve_transport_secret().is_err());
        }
    }

    #[test]
    fn config_file_secret_is_used() {
        let s = Settings {
            transport_secret: Some("from-file".to_string()),
            ..Settings::default()
        };
        if std::env::var(Settings::TRANSPORT_SECRET_ENV).is_err() {
            assert_eq!(s.resolve_transport_secret().unwrap(), "from-file");
        }
    }

    #[test]
    fn data_path_builds_correct_path() {
        let s = Settings::default();
        let root = Path::new("/srv/careportal");
        assert_eq!(
            s.data_path(root),
            PathBuf::from("/srv/careportal/.careportal")
        );
    }
}
