//! One-way hashing of credential tokens.
//!
//! The raw token (the simulated fingerprint scan) is never stored.  The
//! keystore keeps a SHA-256 digest bound to the user id, and verification
//! compares digests in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a credential digest in bytes.
pub const CREDENTIAL_HASH_LEN: usize = 32;

/// Domain separation prefix for credential digests.
const DOMAIN: &[u8] = b"ciphervault-credential\0";

/// Hash a credential token for `user_id`.
///
/// The user id is length-prefixed so `("ab", "c")` and `("a", "bc")`
/// cannot collide.
pub fn hash_credential(user_id: &str, token: &str) -> [u8; CREDENTIAL_HASH_LEN] {
    let id_len = u32::try_from(user_id.len()).unwrap_or(u32::MAX);
    Sha256::new()
        .chain_update(DOMAIN)
        .chain_update(id_len.to_le_bytes())
        .chain_update(user_id.as_bytes())
        .chain_update(token.as_bytes())
        .finalize()
        .into()
}

/// Check `token` against a stored digest without leaking timing
/// information about how many bytes matched.
pub fn verify_credential(user_id: &str, token: &str, expected: &[u8; CREDENTIAL_HASH_LEN]) -> bool {
    let actual = hash_credential(user_id, token);
    actual[..].ct_eq(&expected[..]).into()
}
