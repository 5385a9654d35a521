use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::format::Envelope;
use crate::errors::{CipherVaultError, Result};

/// Identifier of a supported authenticated-encryption algorithm.
///
/// The wire tag is what gets embedded in every envelope, so existing
/// tags must never be renumbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl AlgorithmId {
    /// Every registered algorithm, in rotation order.
    pub const ALL: [AlgorithmId; 2] = [AlgorithmId::Aes256Gcm, AlgorithmId::ChaCha20Poly1305];

    /// Canonical name, as shown to users and stored in the keystore.
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmId::Aes256Gcm => "aes-256-gcm",
            AlgorithmId::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    pub fn wire_tag(self) -> u8 {
        match self {
            AlgorithmId::Aes256Gcm => 1,
            AlgorithmId::ChaCha20Poly1305 => 2,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.wire_tag() == tag)
    }

    /// The algorithm that follows this one in `ALL`, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|a| *a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmId {
    type Err = CipherVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" | "aes" => Ok(AlgorithmId::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" | "chacha20" | "chacha" => {
                Ok(AlgorithmId::ChaCha20Poly1305)
            }
            _ => Err(CipherVaultError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// One authenticated-encryption algorithm.
///
/// Implementations must generate a fresh random nonce on every `seal`
/// and must fail `open` on any modification of the envelope.
pub trait Cipher: Send + Sync {
    fn algorithm(&self) -> AlgorithmId;

    fn seal(&self, key: &[u8], plaintext: &[u8]) -> Result<Envelope>;

    fn open(&self, key: &[u8], envelope: &Envelope) -> Result<zeroize::Zeroizing<Vec<u8>>>;
}
