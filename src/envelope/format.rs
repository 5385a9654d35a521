//! Binary envelope format.
//!
//! ```text
//! [CVEN: 4 bytes][version: 1 byte][algorithm tag: 1 byte][nonce: 12 bytes][ciphertext][tag: 16 bytes]
//! ```
//!
//! The 6-byte header (magic, version, algorithm tag) is passed to the
//! AEAD as associated data, so rewriting the algorithm tag is detected
//! the same way as a flipped ciphertext bit.
//!
//! For display and copy/paste the binary form is wrapped in standard
//! base64 ("armored").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::algorithm::AlgorithmId;
use crate::errors::{CipherVaultError, Result};

/// Magic bytes at the start of every envelope.
const MAGIC: &[u8; 4] = b"CVEN";

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Nonce length shared by both supported AEADs (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length shared by both supported AEADs (128 bits).
pub const TAG_LEN: usize = 16;

/// Magic + version + algorithm tag.
pub const HEADER_LEN: usize = 6;

/// A self-describing ciphertext unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    algorithm: AlgorithmId,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl Envelope {
    pub fn new(
        algorithm: AlgorithmId,
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
        tag: [u8; TAG_LEN],
    ) -> Self {
        Self {
            algorithm,
            nonce,
            ciphertext,
            tag,
        }
    }

    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    /// Serialize to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(HEADER_LEN + NONCE_LEN + self.ciphertext.len() + TAG_LEN);
        buf.extend_from_slice(&associated_data(self.algorithm));
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.tag);
        buf
    }

    /// Parse the binary wire format.
    ///
    /// Every structural problem maps to `DecryptionFailed` so a caller
    /// cannot tell a malformed envelope from a failed authentication.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
            return Err(CipherVaultError::DecryptionFailed);
        }
        if &data[0..4] != MAGIC || data[4] != ENVELOPE_VERSION {
            return Err(CipherVaultError::DecryptionFailed);
        }
        let algorithm =
            AlgorithmId::from_wire_tag(data[5]).ok_or(CipherVaultError::DecryptionFailed)?;

        let body = &data[HEADER_LEN..];
        let (nonce_bytes, rest) = body.split_at(NONCE_LEN);
        let (ciphertext, tag_bytes) = rest.split_at(rest.len() - TAG_LEN);

        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| CipherVaultError::DecryptionFailed)?;
        let tag: [u8; TAG_LEN] = tag_bytes
            .try_into()
            .map_err(|_| CipherVaultError::DecryptionFailed)?;

        Ok(Self {
            algorithm,
            nonce,
            ciphertext: ciphertext.to_vec(),
            tag,
        })
    }

    /// Base64 text form for display and copy/paste.
    pub fn to_armored(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Parse the base64 text form (surrounding whitespace is ignored).
    pub fn from_armored(text: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|_| CipherVaultError::DecryptionFailed)?;
        Self::from_bytes(&bytes)
    }
}

/// The header bytes bound into the AEAD as associated data.
pub fn associated_data(algorithm: AlgorithmId) -> [u8; HEADER_LEN] {
    [
        MAGIC[0],
        MAGIC[1],
        MAGIC[2],
        MAGIC[3],
        ENVELOPE_VERSION,
        algorithm.wire_tag(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope::new(
            AlgorithmId::ChaCha20Poly1305,
            [3u8; NONCE_LEN],
            b"ciphertext".to_vec(),
            [9u8; TAG_LEN],
        )
    }

    #[test]
    fn bytes_layout_matches_format() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..4], b"CVEN");
        assert_eq!(bytes[4], ENVELOPE_VERSION);
        assert_eq!(bytes[5], AlgorithmId::ChaCha20Poly1305.wire_tag());
        assert_eq!(bytes.len(), HEADER_LEN + NONCE_LEN + 10 + TAG_LEN);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn empty_ciphertext_is_structurally_valid() {
        let envelope = Envelope::new(AlgorithmId::Aes256Gcm, [0; NONCE_LEN], Vec::new(), [0; TAG_LEN]);
        let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert!(parsed.ciphertext().is_empty());
    }

    #[test]
    fn malformed_input_is_a_decryption_failure() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CipherVaultError::DecryptionFailed)
        ));

        let mut bytes = sample().to_bytes();
        bytes[5] = 0xEE;
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CipherVaultError::DecryptionFailed)
        ));

        assert!(matches!(
            Envelope::from_bytes(&[0u8; 10]),
            Err(CipherVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn armored_form_tolerates_whitespace() {
        let armored = format!("  {}\n", sample().to_armored());
        assert_eq!(Envelope::from_armored(&armored).unwrap(), sample());
        assert!(matches!(
            Envelope::from_armored("not base64 !!"),
            Err(CipherVaultError::DecryptionFailed)
        ));
    }
}
