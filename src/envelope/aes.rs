//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce.  The
//! ciphertext and the 16-byte tag are kept apart so they map directly onto
//! the envelope fields.

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

use super::algorithm::{AlgorithmId, Cipher};
use super::format::{associated_data, Envelope};
use crate::errors::{CipherVaultError, Result};

/// The AES-256-GCM envelope cipher.
pub struct AesGcm;

impl Cipher for AesGcm {
    fn algorithm(&self) -> AlgorithmId {
        AlgorithmId::Aes256Gcm
    }

    fn seal(&self, key: &[u8], plaintext: &[u8]) -> Result<Envelope> {
        // Build the cipher from the raw key bytes.
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let aad = associated_data(self.algorithm());

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(&nonce, &aad, &mut buffer)
            .map_err(|e| CipherVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        Ok(Envelope::new(
            self.algorithm(),
            nonce.into(),
            buffer,
            tag.into(),
        ))
    }

    fn open(&self, key: &[u8], envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
        if envelope.algorithm() != self.algorithm() {
            return Err(CipherVaultError::DecryptionFailed);
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CipherVaultError::DecryptionFailed)?;
        let aad = associated_data(envelope.algorithm());

        // Decrypt and verify the auth tag.
        let mut buffer = Zeroizing::new(envelope.ciphertext().to_vec());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(envelope.nonce()),
                &aad,
                &mut buffer[..],
                Tag::from_slice(envelope.tag()),
            )
            .map_err(|_| CipherVaultError::DecryptionFailed)?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = [0xABu8; 32];
        let envelope = AesGcm.seal(&key, b"DATABASE_URL=postgres://localhost").unwrap();
        assert_eq!(envelope.algorithm(), AlgorithmId::Aes256Gcm);
        let plaintext = AesGcm.open(&key, &envelope).unwrap();
        assert_eq!(plaintext.as_slice(), b"DATABASE_URL=postgres://localhost");
    }

    #[test]
    fn nonces_are_fresh() {
        let key = [0xCDu8; 32];
        let a = AesGcm.seal(&key, b"same").unwrap();
        let b = AesGcm.seal(&key, b"same").unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            AesGcm.seal(&[0u8; 16], b"x"),
            Err(CipherVaultError::EncryptionFailed(_))
        ));
    }

    #[test]
    fn flipped_tag_fails() {
        let key = [0x11u8; 32];
        let envelope = AesGcm.seal(&key, b"value").unwrap();
        let mut tag = *envelope.tag();
        tag[0] ^= 0x01;
        let tampered = Envelope::new(
            envelope.algorithm(),
            *envelope.nonce(),
            envelope.ciphertext().to_vec(),
            tag,
        );
        assert!(matches!(
            AesGcm.open(&key, &tampered),
            Err(CipherVaultError::DecryptionFailed)
        ));
    }
}
