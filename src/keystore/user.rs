//! User records stored inside the encrypted keystore.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::audit::SYSTEM_ACTOR;
use crate::crypto::{hash_credential, UserKey, CREDENTIAL_HASH_LEN};
use crate::errors::{CipherVaultError, Result};

/// Maximum length of a user id.
pub const MAX_USER_ID_LEN: usize = 64;

/// A registered user: hashed credential plus a private encryption key.
///
/// Records are never mutated in place; they are created on registration
/// and only ever removed as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    user_id: String,

    /// One-way digest of the credential token (base64 in JSON).
    #[serde(serialize_with = "hash_encode", deserialize_with = "hash_decode")]
    credential_hash: [u8; CREDENTIAL_HASH_LEN],

    encryption_key: UserKey,

    created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Build a record for a new user with a freshly generated key.
    pub fn new(user_id: &str, token: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            credential_hash: hash_credential(user_id, token),
            encryption_key: UserKey::generate(),
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn credential_hash(&self) -> &[u8; CREDENTIAL_HASH_LEN] {
        &self.credential_hash
    }

    pub fn encryption_key(&self) -> &UserKey {
        &self.encryption_key
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.user_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Lightweight view of a user (no key material).
///
/// Returned by `KeystoreSession::list_users_summary` so callers can show
/// who is registered without touching any secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Validate that a user id is safe to store and to write into the audit log.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty, at most 64 characters, and not the reserved
/// `system` actor name.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(CipherVaultError::InvalidUserId(
            "user id cannot be empty".into(),
        ));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(CipherVaultError::InvalidUserId(format!(
            "user id cannot exceed {MAX_USER_ID_LEN} characters"
        )));
    }
    if !user_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(CipherVaultError::InvalidUserId(format!(
            "'{user_id}' contains invalid characters — only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    if user_id.eq_ignore_ascii_case(SYSTEM_ACTOR) {
        return Err(CipherVaultError::InvalidUserId(format!(
            "'{user_id}' is reserved"
        )));
    }
    Ok(())
}

fn hash_encode<S>(data: &[u8; CREDENTIAL_HASH_LEN], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn hash_decode<'de, D>(deserializer: D) -> std::result::Result<[u8; CREDENTIAL_HASH_LEN], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
    bytes.as_slice().try_into().map_err(|_| {
        serde::de::Error::custom(format!(
            "credential hash must be {CREDENTIAL_HASH_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}
