use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an authentication attempt was rejected.
///
/// Only used for internal logging. The `Display` of
/// `CipherVaultError::Authentication` never includes it, so callers cannot
/// tell an unknown user from a wrong token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownUser,
    BadCredential,
    BadPassphrase,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AuthFailure::UnknownUser => "unknown user",
            AuthFailure::BadCredential => "credential mismatch",
            AuthFailure::BadPassphrase => "keystore did not decrypt",
        };
        f.write_str(reason)
    }
}

/// All errors that can occur in CipherVault.
#[derive(Debug, Error)]
pub enum CipherVaultError {
    // --- Authentication ---
    #[error("Authentication failed")]
    Authentication(AuthFailure),

    #[error("User '{0}' is already registered")]
    DuplicateUser(String),

    #[error("User '{0}' is not registered")]
    UserNotFound(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Credential token cannot be empty")]
    EmptyCredential,

    // --- Algorithms ---
    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("Algorithm '{0}' is already active — nothing to rotate")]
    NoOpRotation(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Keystore at {0} is locked by another process")]
    KeystoreLocked(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Audit errors ---
    #[error("Audit error: {0}")]
    AuditError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl CipherVaultError {
    /// Returns `true` for failures of the on-disk keystore, salt, or lock.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CipherVaultError::Storage(_)
                | CipherVaultError::KeystoreLocked(_)
                | CipherVaultError::Io(_)
        )
    }

    /// The internal reason behind an authentication failure, if any.
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            CipherVaultError::Authentication(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Convenience type alias for CipherVault results.
pub type Result<T> = std::result::Result<T, CipherVaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_message_hides_reason() {
        let unknown = CipherVaultError::Authentication(AuthFailure::UnknownUser);
        let mismatch = CipherVaultError::Authentication(AuthFailure::BadCredential);
        assert_eq!(unknown.to_string(), mismatch.to_string());
        assert_eq!(mismatch.auth_failure(), Some(AuthFailure::BadCredential));
    }

    #[test]
    fn storage_class_covers_io_and_lock() {
        let io = CipherVaultError::Io(std::io::Error::other("disk"));
        assert!(io.is_storage());
        assert!(CipherVaultError::KeystoreLocked(PathBuf::from("/x")).is_storage());
        assert!(!CipherVaultError::DecryptionFailed.is_storage());
    }
}
