//! Integration tests for the keystore session: persistence, authentication,
//! rotation and crash safety.

use std::fs;
use std::path::Path;

use ciphervault::crypto::Argon2Params;
use ciphervault::envelope::AlgorithmId;
use ciphervault::errors::{AuthFailure, CipherVaultError, Result};
use ciphervault::keystore::{KeystoreOptions, KeystorePaths, KeystoreSession};
use ciphervault::storage::StagedWrite;
use tempfile::TempDir;

const PASSPHRASE: &[u8] = b"test-passphrase";

fn fast_options() -> KeystoreOptions {
    KeystoreOptions {
        argon2: Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        },
        initial_algorithm: AlgorithmId::Aes256Gcm,
    }
}

fn open(dir: &Path) -> Result<KeystoreSession> {
    KeystoreSession::open(dir, PASSPHRASE, &fast_options())
}

// ---------------------------------------------------------------------------
// Open / bootstrap
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_then_reopen() {
    let dir = TempDir::new().unwrap();
    assert!(!KeystoreSession::exists(dir.path()));

    {
        let mut session = open(dir.path()).expect("bootstrap");
        session.register_user("owner", "tok1").unwrap();
    }
    assert!(KeystoreSession::exists(dir.path()));

    let mut session = open(dir.path()).expect("reopen");
    assert_eq!(session.user_count(), 1);
    assert!(session.authenticate("owner", "tok1").is_ok());
}

#[test]
fn reopen_uses_params_stored_in_the_keystore() {
    let dir = TempDir::new().unwrap();
    drop(open(dir.path()).unwrap());

    // Different config on reopen must not change how the key is derived.
    let other = KeystoreOptions {
        argon2: Argon2Params {
            memory_kib: 16_384,
            iterations: 2,
            parallelism: 2,
        },
        initial_algorithm: AlgorithmId::ChaCha20Poly1305,
    };
    let session = KeystoreSession::open(dir.path(), PASSPHRASE, &other).unwrap();
    assert_eq!(session.kdf_params(), fast_options().argon2);
    assert_eq!(session.current_algorithm(), AlgorithmId::Aes256Gcm);
}

#[test]
fn wrong_passphrase_is_an_authentication_error() {
    let dir = TempDir::new().unwrap();
    drop(open(dir.path()).unwrap());

    let err = KeystoreSession::open(dir.path(), b"not-the-passphrase", &fast_options())
        .err()
        .expect("wrong passphrase must fail");
    assert_eq!(err.auth_failure(), Some(AuthFailure::BadPassphrase));
    assert_eq!(err.to_string(), "Authentication failed");
}

#[test]
fn missing_salt_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    drop(open(dir.path()).unwrap());

    fs::remove_file(KeystorePaths::new(dir.path()).salt).unwrap();

    let err = open(dir.path()).err().expect("missing salt must fail");
    assert!(matches!(err, CipherVaultError::Storage(_)));
}

#[test]
fn corrupt_keystore_header_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    drop(open(dir.path()).unwrap());

    let paths = KeystorePaths::new(dir.path());
    let mut bytes = fs::read(&paths.keystore).unwrap();
    bytes[0] = b'X';
    fs::write(&paths.keystore, bytes).unwrap();

    let err = open(dir.path()).err().expect("corrupt file must fail");
    assert!(err.is_storage());
}

#[test]
fn corrupt_kdf_params_are_a_storage_error() {
    let dir = TempDir::new().unwrap();
    drop(open(dir.path()).unwrap());

    let paths = KeystorePaths::new(dir.path());
    let mut bytes = fs::read(&paths.keystore).unwrap();
    // memory_kib lives right after the magic and version byte.
    bytes[5..9].copy_from_slice(&u32::MAX.to_le_bytes());
    fs::write(&paths.keystore, bytes).unwrap();

    let err = open(dir.path()).err().expect("oversized params must fail");
    assert!(matches!(err, CipherVaultError::Storage(_)));
}

#[test]
fn bootstrap_reuses_an_existing_salt() {
    let dir = TempDir::new().unwrap();
    let paths = KeystorePaths::new(dir.path());
    fs::write(&paths.salt, [3u8; 32]).unwrap();

    drop(open(dir.path()).unwrap());
    assert_eq!(fs::read(&paths.salt).unwrap(), vec![3u8; 32]);
    assert!(open(dir.path()).is_ok());
}

#[test]
fn second_session_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let _first = open(dir.path()).unwrap();

    let err = open(dir.path()).err().expect("second opener must fail");
    assert!(matches!(err, CipherVaultError::KeystoreLocked(_)));
    assert!(err.is_storage());
}

// ---------------------------------------------------------------------------
// Authentication isolation
// ---------------------------------------------------------------------------

#[test]
fn wrong_token_fails_authentication() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();
    session.register_user("alice", "right-token").unwrap();

    let err = session.authenticate("alice", "wrong-token").unwrap_err();
    assert!(matches!(err, CipherVaultError::Authentication(_)));
}

#[test]
fn registering_twice_is_a_duplicate_user_error() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();
    session.register_user("alice", "tok").unwrap();

    let err = session.register_user("alice", "tok").unwrap_err();
    assert!(matches!(err, CipherVaultError::DuplicateUser(_)));
}

#[test]
fn export_without_valid_credential_fails_and_is_audited() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();
    session.register_user("alice", "tok").unwrap();

    let err = session.export_key("alice", "bad").unwrap_err();
    assert!(matches!(err, CipherVaultError::Authentication(_)));

    let key = session.export_key("alice", "tok").unwrap();
    assert_eq!(key.len(), 44); // base64 of 32 bytes

    let exports: Vec<_> = session
        .read_audit_log()
        .unwrap()
        .into_iter()
        .filter(|e| e.action == "export-key")
        .collect();
    assert_eq!(exports.len(), 2);
    assert!(!exports[0].outcome.success);
    assert!(exports[1].outcome.success);
}

#[test]
fn unknown_user_and_wrong_token_are_indistinguishable() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();
    session.register_user("alice", "tok").unwrap();

    let unknown = session.encrypt_text("mallory", "tok", "x").unwrap_err();
    let wrong = session.encrypt_text("alice", "nope", "x").unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());

    let entries = session.read_audit_log().unwrap();
    let failures: Vec<_> = entries.iter().filter(|e| !e.outcome.success).collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].outcome.detail, failures[1].outcome.detail);
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

#[test]
fn rotation_does_not_break_old_ciphertexts() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();
    session.register_user("alice", "tok").unwrap();

    let before = session.encrypt_text("alice", "tok", "sealed with aes").unwrap();
    assert_eq!(before.algorithm(), AlgorithmId::Aes256Gcm);

    session.rotate_algorithm("chacha20-poly1305").unwrap();
    let after = session.encrypt_text("alice", "tok", "sealed with chacha").unwrap();
    assert_eq!(after.algorithm(), AlgorithmId::ChaCha20Poly1305);

    drop(session);
    let mut session = open(dir.path()).unwrap();
    assert_eq!(
        session.decrypt_text("alice", "tok", &before).unwrap().as_str(),
        "sealed with aes"
    );
    assert_eq!(
        session.decrypt_text("alice", "tok", &after).unwrap().as_str(),
        "sealed with chacha"
    );
}

#[test]
fn rotating_to_the_active_algorithm_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();

    let err = session.rotate_algorithm("aes-256-gcm").unwrap_err();
    assert!(matches!(err, CipherVaultError::NoOpRotation(_)));
    assert!(session.registry().history().is_empty());
}

#[test]
fn rotating_to_an_unknown_algorithm_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path()).unwrap();

    let err = session.rotate_algorithm("rot13").unwrap_err();
    assert!(matches!(err, CipherVaultError::UnknownAlgorithm(_)));
    assert_eq!(session.current_algorithm(), AlgorithmId::Aes256Gcm);
}

#[test]
fn rotation_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut session = open(dir.path()).unwrap();
        session.rotate_next().unwrap();
        session.rotate_next().unwrap();
    }
    let session = open(dir.path()).unwrap();
    let history = session.registry().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].to, AlgorithmId::ChaCha20Poly1305);
    assert_eq!(history[1].to, AlgorithmId::Aes256Gcm);
    assert!(history[0].timestamp < history[1].timestamp);
}

// ---------------------------------------------------------------------------
// Crash safety
// ---------------------------------------------------------------------------

#[test]
fn interrupted_write_leaves_previous_state() {
    let dir = TempDir::new().unwrap();
    let paths = KeystorePaths::new(dir.path());
    {
        let mut session = open(dir.path()).unwrap();
        session.register_user("owner", "tok1").unwrap();
    }
    let committed = fs::read(&paths.keystore).unwrap();

    // A save that staged its temp file but never reached the rename.
    let staged = StagedWrite::stage(&paths.keystore, b"half-written garbage").unwrap();
    let tmp = staged.tmp_path().to_path_buf();
    std::mem::forget(staged);
    assert!(tmp.exists());
    assert_eq!(fs::read(&paths.keystore).unwrap(), committed);

    // Reopen sees the prior state; the next save sweeps the leftover.
    let mut session = open(dir.path()).unwrap();
    assert!(session.authenticate("owner", "tok1").is_ok());
    assert!(tmp.exists());

    session.register_user("second", "tok2").unwrap();
    assert!(!tmp.exists());
}

#[test]
fn every_save_rewrites_with_a_fresh_nonce() {
    let dir = TempDir::new().unwrap();
    let paths = KeystorePaths::new(dir.path());
    let session = open(dir.path()).unwrap();

    let first = fs::read(&paths.keystore).unwrap();
    session.save().unwrap();
    let second = fs::read(&paths.keystore).unwrap();
    assert_ne!(first, second);
}

#[cfg(unix)]
#[test]
fn keystore_files_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let paths = KeystorePaths::new(dir.path().join("data"));
    let mut session = open(&paths.data_dir).unwrap();
    session.register_user("owner", "tok1").unwrap();

    for path in [&paths.keystore, &paths.salt, &paths.audit] {
        let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "{} has mode {mode:o}", path.display());
    }
    let dir_mode = fs::metadata(&paths.data_dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700);
}
