//! Envelope encryption of user text.
//!
//! An `Envelope` is self-describing: it carries the id of the algorithm
//! that produced it, the nonce, the ciphertext and the authentication tag.
//! `decrypt` picks the cipher from the envelope itself and never from the
//! keystore's currently active algorithm, which is what keeps algorithm
//! rotation from breaking older ciphertexts.
//!
//! This module provides:
//! - `AlgorithmId` and the `Cipher` trait (`algorithm`)
//! - AES-256-GCM (`aes`) and ChaCha20-Poly1305 (`chacha`) ciphers
//! - The binary and base64 wire format (`format`)

pub mod aes;
pub mod algorithm;
pub mod chacha;
pub mod format;

use zeroize::Zeroizing;

use crate::errors::Result;

pub use algorithm::{AlgorithmId, Cipher};
pub use format::{Envelope, NONCE_LEN, TAG_LEN};

/// Resolve the cipher implementation for an algorithm id.
pub fn cipher_for(algorithm: AlgorithmId) -> &'static dyn Cipher {
    match algorithm {
        AlgorithmId::Aes256Gcm => &aes::AesGcm,
        AlgorithmId::ChaCha20Poly1305 => &chacha::ChaChaPoly,
    }
}

/// Encrypt `plaintext` under `key` with the given algorithm.
pub fn encrypt(algorithm: AlgorithmId, key: &[u8], plaintext: &[u8]) -> Result<Envelope> {
    cipher_for(algorithm).seal(key, plaintext)
}

/// Decrypt an envelope, dispatching on the algorithm it was sealed with.
pub fn decrypt(key: &[u8], envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
    cipher_for(envelope.algorithm()).open(key, envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CipherVaultError;

    #[test]
    fn decrypt_follows_the_envelope_algorithm() {
        let key = [0x5Au8; 32];
        for algorithm in AlgorithmId::ALL {
            let envelope = encrypt(algorithm, &key, b"hello").unwrap();
            assert_eq!(envelope.algorithm(), algorithm);
            assert_eq!(decrypt(&key, &envelope).unwrap().as_slice(), b"hello");
        }
    }

    #[test]
    fn wrong_key_is_a_decryption_failure() {
        let envelope = encrypt(AlgorithmId::ChaCha20Poly1305, &[1u8; 32], b"secret").unwrap();
        let err = decrypt(&[2u8; 32], &envelope).unwrap_err();
        assert!(matches!(err, CipherVaultError::DecryptionFailed));
    }
}
