//! Binary keystore file format.
//!
//! A `keystore.bin` file has this layout:
//!
//! ```text
//! [CVKS: 4 bytes][version: 1 byte][memory_kib: u32 LE][iterations: u32 LE][parallelism: u32 LE][envelope]
//! ```
//!
//! - **Magic** (`CVKS`): identifies the file as a CipherVault keystore.
//! - **Version**: format version (currently `1`).
//! - **Argon2 params**: the KDF settings used when the keystore was
//!   created, so reopening does not depend on the current config.
//! - **Envelope**: the JSON-serialized `KeystoreState`, sealed with the
//!   registry's active algorithm under a sub-key of the master key.
//!
//! Authentication of the whole payload comes from the AEAD tag inside the
//! envelope; a wrong passphrase and a modified payload look the same.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::credentials::CredentialStore;
use super::registry::AlgorithmRegistry;
use crate::crypto::{Argon2Params, MasterKey};
use crate::envelope::{self, AlgorithmId, Envelope};
use crate::errors::{AuthFailure, CipherVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every keystore file.
const MAGIC: &[u8; 4] = b"CVKS";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 3 * 4 (Argon2 params).
const PREFIX_LEN: usize = 17;

// ---------------------------------------------------------------------------
// KeystoreState
// ---------------------------------------------------------------------------

/// Everything stored inside the encrypted blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeystoreState {
    pub users: CredentialStore,
    pub registry: AlgorithmRegistry,
}

impl KeystoreState {
    /// Empty state for a freshly bootstrapped keystore.
    pub fn new(initial_algorithm: AlgorithmId) -> Self {
        Self {
            users: CredentialStore::new(),
            registry: AlgorithmRegistry::new(initial_algorithm),
        }
    }

    fn check_invariants(&self) -> Result<()> {
        self.users.check_invariants()?;
        self.registry.check_invariants()
    }
}

// ---------------------------------------------------------------------------
// KeystoreFile
// ---------------------------------------------------------------------------

/// A parsed but still encrypted keystore file.
#[derive(Debug, Clone)]
pub struct KeystoreFile {
    pub params: Argon2Params,
    pub envelope: Envelope,
}

impl KeystoreFile {
    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.envelope.to_bytes();
        let mut buf = Vec::with_capacity(PREFIX_LEN + body.len());

        buf.extend_from_slice(MAGIC); // 4 bytes
        buf.push(CURRENT_VERSION); // 1 byte
        buf.extend_from_slice(&self.params.memory_kib.to_le_bytes());
        buf.extend_from_slice(&self.params.iterations.to_le_bytes());
        buf.extend_from_slice(&self.params.parallelism.to_le_bytes());
        buf.extend_from_slice(&body);
        buf
    }

    /// Parse the on-disk layout.  Structural problems are storage errors.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < PREFIX_LEN {
            return Err(CipherVaultError::Storage(
                "file too small to be a valid keystore".into(),
            ));
        }

        if &data[0..4] != MAGIC {
            return Err(CipherVaultError::Storage(
                "missing CVKS magic bytes".into(),
            ));
        }

        let version = data[4];
        if version != CURRENT_VERSION {
            return Err(CipherVaultError::Storage(format!(
                "unsupported keystore version {version}, expected {CURRENT_VERSION}"
            )));
        }

        let params = Argon2Params {
            memory_kib: read_u32(data, 5)?,
            iterations: read_u32(data, 9)?,
            parallelism: read_u32(data, 13)?,
        };
        params.validate().map_err(|e| {
            CipherVaultError::Storage(format!("keystore header has invalid KDF params: {e}"))
        })?;

        let envelope = Envelope::from_bytes(&data[PREFIX_LEN..])
            .map_err(|_| CipherVaultError::Storage("keystore payload is malformed".into()))?;

        Ok(Self { params, envelope })
    }
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| CipherVaultError::Storage("truncated keystore header".into()))?;
    Ok(u32::from_le_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read and parse `keystore.bin`.  A missing file is a storage error.
pub fn read_keystore(path: &Path) -> Result<KeystoreFile> {
    let data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            CipherVaultError::Storage(format!("keystore not found at {}", path.display()))
        }
        _ => CipherVaultError::Io(e),
    })?;
    KeystoreFile::from_bytes(&data)
}

/// Serialize and encrypt `state` with the registry's active algorithm.
///
/// Every call uses a fresh nonce, so saving the same state twice yields
/// different bytes.
pub fn seal_state(
    state: &KeystoreState,
    params: &Argon2Params,
    master_key: &MasterKey,
) -> Result<KeystoreFile> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(state)
            .map_err(|e| CipherVaultError::SerializationError(format!("keystore state: {e}")))?,
    );
    let key = master_key.derive_keystore_key()?;
    let envelope = envelope::encrypt(state.registry.current(), &key[..], &plaintext)?;

    Ok(KeystoreFile {
        params: *params,
        envelope,
    })
}

/// Decrypt and deserialize the state held in `file`.
///
/// A failed AEAD check means the passphrase is wrong (or the payload was
/// modified) and is reported as an authentication failure.  A payload
/// that decrypts but does not describe a consistent state is a storage
/// error.  Nothing is returned unless the whole state is valid.
pub fn open_state(file: &KeystoreFile, master_key: &MasterKey) -> Result<KeystoreState> {
    let key = master_key.derive_keystore_key()?;
    let plaintext = envelope::decrypt(&key[..], &file.envelope).map_err(|e| match e {
        CipherVaultError::DecryptionFailed => {
            CipherVaultError::Authentication(AuthFailure::BadPassphrase)
        }
        other => other,
    })?;

    let state: KeystoreState = serde_json::from_slice(&plaintext)
        .map_err(|e| CipherVaultError::Storage(format!("keystore payload: {e}")))?;
    state.check_invariants()?;
    Ok(state)
}
