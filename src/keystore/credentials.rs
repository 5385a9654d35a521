//! The credential store: user id -> `UserRecord`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::user::{validate_user_id, UserRecord, UserSummary};
use crate::crypto::{verify_credential, CREDENTIAL_HASH_LEN};
use crate::errors::{AuthFailure, CipherVaultError, Result};

/// Digest compared against when the user does not exist, so an unknown
/// id costs the same work as a wrong token.
const DUMMY_HASH: [u8; CREDENTIAL_HASH_LEN] = [0u8; CREDENTIAL_HASH_LEN];

/// All registered users, keyed (and serialized in order) by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    users: BTreeMap<String, UserRecord>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user with a freshly generated encryption key.
    ///
    /// Only a digest of `token` is kept.
    pub fn register(&mut self, user_id: &str, token: &str) -> Result<&UserRecord> {
        validate_user_id(user_id)?;
        if token.is_empty() {
            return Err(CipherVaultError::EmptyCredential);
        }
        if self.users.contains_key(user_id) {
            return Err(CipherVaultError::DuplicateUser(user_id.to_string()));
        }

        let record = UserRecord::new(user_id, token);
        Ok(self.users.entry(user_id.to_string()).or_insert(record))
    }

    /// Verify `token` for `user_id` in constant time.
    ///
    /// Unknown user and wrong token produce the same error message; only
    /// the attached `AuthFailure` tells them apart.
    pub fn authenticate(&self, user_id: &str, token: &str) -> Result<&UserRecord> {
        match self.users.get(user_id) {
            Some(record) if verify_credential(user_id, token, record.credential_hash()) => {
                Ok(record)
            }
            Some(_) => Err(CipherVaultError::Authentication(AuthFailure::BadCredential)),
            None => {
                let _ = verify_credential(user_id, token, &DUMMY_HASH);
                Err(CipherVaultError::Authentication(AuthFailure::UnknownUser))
            }
        }
    }

    /// Look up a user without checking credentials.
    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    /// Administrative removal of a user and their key.
    pub fn remove(&mut self, user_id: &str) -> Result<UserRecord> {
        self.users
            .remove(user_id)
            .ok_or_else(|| CipherVaultError::UserNotFound(user_id.to_string()))
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Every record must be stored under its own, valid user id.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        for (id, record) in &self.users {
            if id != record.user_id() || validate_user_id(id).is_err() {
                return Err(CipherVaultError::Storage(format!(
                    "user record '{id}' is inconsistent"
                )));
            }
        }
        Ok(())
    }

    /// Metadata for every user, sorted by id.
    pub fn summaries(&self) -> Vec<UserSummary> {
        self.users.values().map(UserRecord::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_authenticate() {
        let mut store = CredentialStore::new();
        let key = store.register("alice", "tok1").unwrap().encryption_key().clone();

        let record = store.authenticate("alice", "tok1").unwrap();
        assert_eq!(record.user_id(), "alice");
        assert_eq!(record.encryption_key(), &key);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut store = CredentialStore::new();
        store.register("alice", "tok1").unwrap();
        let err = store.register("alice", "tok2").unwrap_err();
        assert!(matches!(err, CipherVaultError::DuplicateUser(id) if id == "alice"));

        // The original credential still works.
        assert!(store.authenticate("alice", "tok1").is_ok());
    }

    #[test]
    fn wrong_token_and_unknown_user_look_the_same() {
        let mut store = CredentialStore::new();
        store.register("alice", "tok1").unwrap();

        let wrong = store.authenticate("alice", "wrong-token").unwrap_err();
        let unknown = store.authenticate("mallory", "tok1").unwrap_err();

        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.auth_failure(), Some(AuthFailure::BadCredential));
        assert_eq!(unknown.auth_failure(), Some(AuthFailure::UnknownUser));
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut store = CredentialStore::new();
        assert!(matches!(
            store.register("alice", ""),
            Err(CipherVaultError::EmptyCredential)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_user_id_is_rejected() {
        let mut store = CredentialStore::new();
        assert!(matches!(
            store.register("bad id", "tok"),
            Err(CipherVaultError::InvalidUserId(_))
        ));
    }

    #[test]
    fn remove_deletes_the_record() {
        let mut store = CredentialStore::new();
        store.register("alice", "tok1").unwrap();
        store.register("bob", "tok2").unwrap();

        store.remove("alice").unwrap();
        assert!(!store.contains("alice"));
        assert_eq!(store.len(), 1);
        assert!(store.remove("alice").is_err());
    }

    #[test]
    fn summaries_are_sorted_by_id() {
        let mut store = CredentialStore::new();
        store.register("secretary", "t2").unwrap();
        store.register("owner", "t1").unwrap();

        let ids: Vec<_> = store.summaries().into_iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec!["owner", "secretary"]);
    }
}
