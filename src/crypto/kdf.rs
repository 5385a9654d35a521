//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Parameters are configurable via `Argon2Params`
//! (loaded from `.ciphervault.toml` or sensible defaults) and are stored
//! in the keystore header so a keystore always reopens with the
//! parameters it was created with.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::keys::{MasterKey, KEY_LEN};
use crate::errors::{CipherVaultError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum memory cost in KiB (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4_194_304;

/// Maximum number of iterations.
pub const MAX_ITERATIONS: u32 = 64;

/// Maximum number of parallelism lanes.
pub const MAX_PARALLELISM: u32 = 64;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameters weak enough to make offline guessing cheap, or
    /// large enough that deriving a key would exhaust memory or never finish.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(CipherVaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(CipherVaultError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(CipherVaultError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(CipherVaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at most {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(CipherVaultError::KeyDerivationFailed(format!(
                "Argon2 iterations must be at most {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(CipherVaultError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be at most {MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive the 32-byte master key from a passphrase and salt.
///
/// The same passphrase + salt + params always produce the same key, which
/// is what lets a keystore be reopened across sessions.
pub fn derive_master_key(
    passphrase: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<MasterKey> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CipherVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| {
            CipherVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

    let master_key = MasterKey::new(key);
    key.zeroize();
    Ok(master_key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
