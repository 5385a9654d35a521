//! Cryptographic primitives for CipherVault.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - Master/user key types and HKDF sub-keys (`keys`)
//! - Credential token hashing with constant-time verification (`credential`)
//!
//! Authenticated encryption of user text lives in `crate::envelope`.

pub mod credential;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{derive_master_key, MasterKey, ...};
pub use credential::{hash_credential, verify_credential, CREDENTIAL_HASH_LEN};
pub use kdf::{derive_master_key, generate_salt, Argon2Params, SALT_LEN};
pub use keys::{MasterKey, UserKey, KEY_LEN};
