use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::envelope::AlgorithmId;
use crate::errors::{CipherVaultError, Result};
use crate::keystore::KeystoreOptions;

/// Project-level configuration, loaded from `.ciphervault.toml`.
///
/// Every field has a sensible default so CipherVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the keystore files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Algorithm a new keystore starts with (default: aes-256-gcm).
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".ciphervault".to_string()
}

fn default_algorithm() -> String {
    AlgorithmId::default().as_str().to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_algorithm: default_algorithm(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".ciphervault.toml";

    /// Load settings from `<project_dir>/.ciphervault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CipherVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the data directory.
    ///
    /// Example: `project_dir/.ciphervault`
    pub fn data_dir_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.data_dir)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Options used when a keystore is created for the first time.
    pub fn keystore_options(&self) -> Result<KeystoreOptions> {
        let initial_algorithm: AlgorithmId = self.default_algorithm.parse().map_err(|_| {
            CipherVaultError::ConfigError(format!(
                "default_algorithm '{}' is not a supported algorithm",
                self.default_algorithm
            ))
        })?;

        let argon2 = self.argon2_params();
        argon2
            .validate()
            .map_err(|e| CipherVaultError::ConfigError(format!("{}: {e}", Self::FILE_NAME)))?;

        Ok(KeystoreOptions {
            argon2,
            initial_algorithm,
        })
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
        assert_eq!(s.data_dir, ".ciphervault");
        assert_eq!(s.default_algorithm, "aes-256-gcm");
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, ".ciphervault");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
data_dir = "secrets"
default_algorithm = "chacha20-poly1305"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
"#;
        fs::write(tmp.path().join(".ciphervault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, "secrets");
        assert_eq!(settings.default_algorithm, "chacha20-poly1305");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let config = "default_algorithm = \"chacha20\"\n";
        fs::write(tmp.path().join(".ciphervault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_algorithm, "chacha20");
        // Rest should be defaults
        assert_eq!(settings.data_dir, ".ciphervault");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".ciphervault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(CipherVaultError::ConfigError(_))));
    }

    #[test]
    fn data_dir_path_respects_custom_dir() {
        let s = Settings {
            data_dir: "secrets".to_string(),
            ..Settings::default()
        };
        let project = Path::new("/home/user/myproject");
        assert_eq!(
            s.data_dir_path(project),
            PathBuf::from("/home/user/myproject/secrets")
        );
    }

    #[test]
    fn keystore_options_parse_algorithm_aliases() {
        let s = Settings {
            default_algorithm: "chacha20".to_string(),
            ..Settings::default()
        };
        let options = s.keystore_options().unwrap();
        assert_eq!(options.initial_algorithm, AlgorithmId::ChaCha20Poly1305);
        assert_eq!(options.argon2, Argon2Params::default());
    }

    #[test]
    fn keystore_options_reject_unknown_algorithm() {
        let s = Settings {
            default_algorithm: "fernet".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            s.keystore_options(),
            Err(CipherVaultError::ConfigError(_))
        ));
    }

    #[test]
    fn keystore_options_reject_out_of_range_argon2_settings() {
        let s = Settings {
            argon2_memory_kib: u32::MAX,
            ..Settings::default()
        };
        assert!(matches!(
            s.keystore_options(),
            Err(CipherVaultError::ConfigError(_))
        ));

        let s = Settings {
            argon2_iterations: 1_000,
            ..Settings::default()
        };
        assert!(matches!(
            s.keystore_options(),
            Err(CipherVaultError::ConfigError(_))
        ));
    }
}
