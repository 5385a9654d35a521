//! ChaCha20-Poly1305 authenticated encryption.

use chacha20poly1305::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce, Tag};
use zeroize::Zeroizing;

use super::algorithm::{AlgorithmId, Cipher};
use super::format::{associated_data, Envelope};
use crate::errors::{CipherVaultError, Result};

/// The ChaCha20-Poly1305 envelope cipher.
pub struct ChaChaPoly;

impl Cipher for ChaChaPoly {
    fn algorithm(&self) -> AlgorithmId {
        AlgorithmId::ChaCha20Poly1305
    }

    fn seal(&self, key: &[u8], plaintext: &[u8]) -> Result<Envelope> {
        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|e| CipherVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let aad = associated_data(self.algorithm());

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(&nonce, &aad, &mut buffer)
            .map_err(|_| CipherVaultError::EncryptionFailed("encryption error".into()))?;

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
            ChaCha20Poly1305::new_from_slice(key).map_err(|_| CipherVaultError::DecryptionFailed)?;
        let aad = associated_data(envelope.algorithm());

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
