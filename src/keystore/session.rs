//! `KeystoreSession`: the unlocked keystore and every operation on it.
//!
//! A session owns the master key, the decrypted state, the audit log and
//! the directory lock.  Mutating methods take `&mut self` and follow the
//! same pattern: snapshot the state, mutate, persist, roll back on a
//! persistence failure, then append an audit entry.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::format::{self, KeystoreState};
use super::paths::KeystorePaths;
use super::registry::{AlgorithmRegistry, RotationEvent};
use super::salt;
use super::user::{validate_user_id, UserRecord, UserSummary};
use crate::audit::{AuditEntry, AuditLog, Outcome, SYSTEM_ACTOR};
use crate::crypto::{derive_master_key, Argon2Params, MasterKey};
use crate::envelope::{self, AlgorithmId, Envelope};
use crate::errors::{CipherVaultError, Result};
use crate::storage::{remove_stale_temp_files, write_atomic, KeystoreLock};

/// Audit action names.
mod action {
    pub const REGISTER: &str = "register";
    pub const AUTHENTICATE: &str = "authenticate";
    pub const ENCRYPT: &str = "encrypt";
    pub const DECRYPT: &str = "decrypt";
    pub const ROTATE: &str = "rotate";
    pub const EXPORT_KEY: &str = "export-key";
    pub const REMOVE_USER: &str = "remove-user";
    pub const UNLOCK: &str = "unlock";
}

/// Settings used only when a keystore is bootstrapped.
///
/// An existing keystore always reopens with the KDF params stored in its
/// header and the algorithm recorded in its registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeystoreOptions {
    pub argon2: Argon2Params,
    pub initial_algorithm: AlgorithmId,
}

/// An open, unlocked keystore.
pub struct KeystoreSession {
    paths: KeystorePaths,

    /// KDF params written into the keystore header on every save.
    params: Argon2Params,

    /// Zeroized on drop.
    master_key: MasterKey,

    state: KeystoreState,

    audit: AuditLog,

    /// Held for the lifetime of the session.
    _lock: KeystoreLock,
}

impl KeystoreSession {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the keystore in `data_dir`, creating it on first run.
    ///
    /// For an existing keystore the master key is derived from the stored
    /// salt and header params, and the state is decrypted in full before
    /// anything is returned.  A wrong passphrase fails with
    /// `Authentication`; a missing salt or corrupt file with `Storage`.
    /// If no keystore exists yet, an empty one is created with a new salt
    /// (an existing salt file is reused) and saved immediately.
    pub fn open(data_dir: &Path, passphrase: &[u8], options: &KeystoreOptions) -> Result<Self> {
        let paths = KeystorePaths::new(data_dir);
        create_data_dir(&paths.data_dir)?;

        let lock = KeystoreLock::acquire(&paths.lock)?;
        let mut audit = AuditLog::open(&paths.audit);

        if !paths.keystore_exists() {
            return Self::bootstrap(paths, lock, audit, passphrase, options);
        }

        let file = format::read_keystore(&paths.keystore)?;
        let salt = salt::load_salt(&paths.salt)?;
        let master_key = derive_master_key(passphrase, &salt, &file.params)?;

        let state = match format::open_state(&file, &master_key) {
            Ok(state) => state,
            Err(e) => {
                let outcome = failure_outcome(action::UNLOCK, &e);
                record_to(&mut audit, SYSTEM_ACTOR, action::UNLOCK, outcome);
                return Err(e);
            }
        };

        info!(
            path = %paths.keystore.display(),
            users = state.users.len(),
            algorithm = %state.registry.current(),
            "opened keystore"
        );

        Ok(Self {
            paths,
            params: file.params,
            master_key,
            state,
            audit,
            _lock: lock,
        })
    }

    fn bootstrap(
        paths: KeystorePaths,
        lock: KeystoreLock,
        audit: AuditLog,
        passphrase: &[u8],
        options: &KeystoreOptions,
    ) -> Result<Self> {
        options.argon2.validate()?;

        let salt = salt::load_or_create_salt(&paths.salt)?;
        let master_key = derive_master_key(passphrase, &salt, &options.argon2)?;

        let session = Self {
            paths,
            params: options.argon2,
            master_key,
            state: KeystoreState::new(options.initial_algorithm),
            audit,
            _lock: lock,
        };
        session.save()?;

        info!(
            path = %session.paths.keystore.display(),
            algorithm = %options.initial_algorithm,
            "created new keystore"
        );
        Ok(session)
    }

    /// Whether a keystore has been initialised in `data_dir`.
    pub fn exists(data_dir: &Path) -> bool {
        KeystorePaths::new(data_dir).keystore_exists()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a user with a fresh per-user key and persist.
    pub fn register_user(&mut self, user_id: &str, token: &str) -> Result<UserSummary> {
        let result = self.commit(|state| {
            state
                .users
                .register(user_id, token)
                .map(UserRecord::summary)
        });

        let outcome = match &result {
            Ok(_) => Outcome::success(),
            Err(e) => failure_outcome(action::REGISTER, e),
        };
        self.record(actor_for(user_id), action::REGISTER, outcome);
        result
    }

    /// Check a user's credential token.
    pub fn authenticate(&mut self, user_id: &str, token: &str) -> Result<UserSummary> {
        let result = self
            .state
            .users
            .authenticate(user_id, token)
            .map(UserRecord::summary);

        let outcome = match &result {
            Ok(_) => Outcome::success(),
            Err(e) => failure_outcome(action::AUTHENTICATE, e),
        };
        self.record(actor_for(user_id), action::AUTHENTICATE, outcome);
        result
    }

    /// Return the user's key as base64.
    ///
    /// Authentication happens in the same call, and the attempt is audited
    /// whether or not it succeeds.
    pub fn export_key(&mut self, user_id: &str, token: &str) -> Result<Zeroizing<String>> {
        let result = self
            .state
            .users
            .authenticate(user_id, token)
            .map(|record| record.encryption_key().to_base64());

        let outcome = match &result {
            Ok(_) => Outcome::success(),
            Err(e) => failure_outcome(action::EXPORT_KEY, e),
        };
        self.record(actor_for(user_id), action::EXPORT_KEY, outcome);
        result
    }

    /// Administrative removal of a user and their key.  Persisted.
    ///
    /// Anything encrypted for the user becomes undecryptable.
    pub fn remove_user(&mut self, user_id: &str) -> Result<UserSummary> {
        let result = self.commit(|state| state.users.remove(user_id).map(|r| r.summary()));

        let outcome = match &result {
            Ok(_) => Outcome::success().with_detail(user_id),
            Err(e) => failure_outcome(action::REMOVE_USER, e),
        };
        self.record(SYSTEM_ACTOR, action::REMOVE_USER, outcome);
        result
    }

    /// Registered users, sorted by id.  No key material.
    pub fn list_users_summary(&self) -> Vec<UserSummary> {
        self.state.users.summaries()
    }

    // ------------------------------------------------------------------
    // Encryption
    // ------------------------------------------------------------------

    /// Authenticate the user and encrypt `plaintext` under their key with
    /// the currently active algorithm.
    pub fn encrypt_text(&mut self, user_id: &str, token: &str, plaintext: &str) -> Result<Envelope> {
        let algorithm = self.state.registry.current();
        let result = self
            .state
            .users
            .authenticate(user_id, token)
            .and_then(|record| {
                envelope::encrypt(
                    algorithm,
                    record.encryption_key().as_bytes(),
                    plaintext.as_bytes(),
                )
            });

        let outcome = match &result {
            Ok(_) => Outcome::success().with_detail(algorithm.as_str()),
            Err(e) => failure_outcome(action::ENCRYPT, e),
        };
        self.record(actor_for(user_id), action::ENCRYPT, outcome);
        result
    }

    /// Authenticate the user and decrypt an envelope.
    ///
    /// The cipher is chosen by the envelope's own algorithm tag, so text
    /// encrypted before a rotation still decrypts.
    pub fn decrypt_text(
        &mut self,
        user_id: &str,
        token: &str,
        envelope: &Envelope,
    ) -> Result<Zeroizing<String>> {
        let result = self
            .state
            .users
            .authenticate(user_id, token)
            .and_then(|record| envelope::decrypt(record.encryption_key().as_bytes(), envelope))
            .and_then(|bytes| into_text(&bytes));

        let outcome = match &result {
            Ok(_) => Outcome::success().with_detail(envelope.algorithm().as_str()),
            Err(e) => failure_outcome(action::DECRYPT, e),
        };
        self.record(actor_for(user_id), action::DECRYPT, outcome);
        result
    }

    /// `decrypt_text` for the base64 armored form.
    pub fn decrypt_armored(
        &mut self,
        user_id: &str,
        token: &str,
        armored: &str,
    ) -> Result<Zeroizing<String>> {
        match Envelope::from_armored(armored) {
            Ok(envelope) => self.decrypt_text(user_id, token, &envelope),
            Err(e) => {
                let outcome = failure_outcome(action::DECRYPT, &e);
                self.record(actor_for(user_id), action::DECRYPT, outcome);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// Rotate to the algorithm named `name` (canonical name or alias).
    pub fn rotate_algorithm(&mut self, name: &str) -> Result<RotationEvent> {
        match name.parse::<AlgorithmId>() {
            Ok(to) => self.rotate_to(to),
            Err(e) => {
                let outcome = failure_outcome(action::ROTATE, &e);
                self.record(SYSTEM_ACTOR, action::ROTATE, outcome);
                Err(e)
            }
        }
    }

    /// Rotate to the next registered algorithm after the active one.
    pub fn rotate_next(&mut self) -> Result<RotationEvent> {
        let to = self.state.registry.current().next();
        self.rotate_to(to)
    }

    /// Make `to` the active algorithm and persist.
    ///
    /// Existing envelopes are untouched; only new encryptions (and the
    /// keystore blob itself) use the new algorithm.
    pub fn rotate_to(&mut self, to: AlgorithmId) -> Result<RotationEvent> {
        let result = self.commit(|state| state.registry.rotate(to));

        let outcome = match &result {
            Ok(event) => Outcome::success().with_detail(format!("{} -> {}", event.from, event.to)),
            Err(e) => failure_outcome(action::ROTATE, e),
        };
        self.record(SYSTEM_ACTOR, action::ROTATE, outcome);

        if let Ok(event) = &result {
            info!(from = %event.from, to = %event.to, "rotated active algorithm");
        }
        result
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.state.registry
    }

    pub fn current_algorithm(&self) -> AlgorithmId {
        self.state.registry.current()
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Every audit entry, oldest first.
    pub fn read_audit_log(&self) -> Result<Vec<AuditEntry>> {
        self.audit.read_entries()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encrypt the full state with a fresh nonce and replace
    /// `keystore.bin` atomically.  Leftover temp files from earlier
    /// interrupted saves are removed afterwards.
    pub fn save(&self) -> Result<()> {
        let file = format::seal_state(&self.state, &self.params, &self.master_key)?;
        write_atomic(&self.paths.keystore, &file.to_bytes())?;
        remove_stale_temp_files(&self.paths.keystore);

        debug!(path = %self.paths.keystore.display(), "saved keystore");
        Ok(())
    }

    /// Run `mutate` and persist the result.  If either step fails the
    /// in-memory state is restored to what it was before.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut KeystoreState) -> Result<T>) -> Result<T> {
        let snapshot = self.state.clone();

        let value = match mutate(&mut self.state) {
            Ok(value) => value,
            Err(e) => {
                self.state = snapshot;
                return Err(e);
            }
        };

        if let Err(e) = self.save() {
            warn!(error = %e, "failed to persist keystore, rolling back");
            self.state = snapshot;
            return Err(e);
        }
        Ok(value)
    }

    fn record(&mut self, actor: &str, action: &str, outcome: Outcome) {
        record_to(&mut self.audit, actor, action, outcome);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn paths(&self) -> &KeystorePaths {
        &self.paths
    }

    /// KDF params this keystore was created with.
    pub fn kdf_params(&self) -> Argon2Params {
        self.params
    }

    pub fn user_count(&self) -> usize {
        self.state.users.len()
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

/// Create the data directory (owner-only) if it does not exist yet.
fn create_data_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Append to the audit log; a failure is logged and otherwise ignored.
fn record_to(audit: &mut AuditLog, actor: &str, action: &str, outcome: Outcome) {
    if let Err(e) = audit.append(actor, action, outcome) {
        warn!(action, error = %e, "could not write audit entry");
    }
}

/// Invalid ids are never written to the log verbatim.
fn actor_for(user_id: &str) -> &str {
    if validate_user_id(user_id).is_ok() {
        user_id
    } else {
        SYSTEM_ACTOR
    }
}

/// Audit outcome for a failed operation.  The detail never tells an
/// unknown user apart from a wrong token.
fn failure_outcome(action: &str, err: &CipherVaultError) -> Outcome {
    if let Some(reason) = err.auth_failure() {
        warn!(action, %reason, "authentication failed");
    } else {
        debug!(action, error = %err, "operation failed");
    }

    let detail = match err {
        CipherVaultError::Authentication(_) => "authentication failed",
        CipherVaultError::DuplicateUser(_) => "duplicate user",
        CipherVaultError::UserNotFound(_) => "unknown user",
        CipherVaultError::InvalidUserId(_) => "invalid user id",
        CipherVaultError::EmptyCredential => "empty credential",
        CipherVaultError::UnknownAlgorithm(_) => "unknown algorithm",
        CipherVaultError::NoOpRotation(_) => "algorithm already active",
        CipherVaultError::DecryptionFailed => "decryption failed",
        e if e.is_storage() => "storage error",
        _ => "error",
    };
    Outcome::failure().with_detail(detail)
}

fn into_text(bytes: &[u8]) -> Result<Zeroizing<String>> {
    String::from_utf8(bytes.to_vec())
        .map(Zeroizing::new)
        .map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            CipherVaultError::DecryptionFailed
        })
}
