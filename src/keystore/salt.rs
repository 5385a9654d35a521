//! The KDF salt file (`salt.bin`).
//!
//! 32 random bytes, stored in the clear.  Written once and never replaced:
//! losing or changing it makes the keystore unopenable.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::crypto::{generate_salt, SALT_LEN};
use crate::errors::{CipherVaultError, Result};
use crate::storage::write_atomic;

/// Read an existing salt file.
pub fn load_salt(path: &Path) -> Result<[u8; SALT_LEN]> {
    let data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            CipherVaultError::Storage(format!("salt file missing at {}", path.display()))
        }
        _ => CipherVaultError::Io(e),
    })?;

    data.as_slice().try_into().map_err(|_| {
        CipherVaultError::Storage(format!(
            "salt file {} must be {SALT_LEN} bytes, found {}",
            path.display(),
            data.len()
        ))
    })
}

/// Generate and persist a new salt.  Refuses to replace an existing file.
pub fn create_salt(path: &Path) -> Result<[u8; SALT_LEN]> {
    if path.exists() {
        return Err(CipherVaultError::Storage(format!(
            "salt file already exists at {}",
            path.display()
        )));
    }

    let salt = generate_salt();
    write_atomic(path, &salt)?;
    info!(path = %path.display(), "created new salt");
    Ok(salt)
}

/// Reuse the salt at `path` if present, otherwise create one.
pub fn load_or_create_salt(path: &Path) -> Result<[u8; SALT_LEN]> {
    if path.exists() {
        load_salt(path)
    } else {
        create_salt(path)
    }
}
