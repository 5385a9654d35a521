//! The encrypted keystore: users, algorithm registry and persistence.
//!
//! - `user` / `credentials`: user records and the credential store.
//! - `registry`: active algorithm plus rotation history.
//! - `format`: the `keystore.bin` layout and sealing of the state.
//! - `salt`: the KDF salt file.
//! - `session`: `KeystoreSession`, the public entry point.

pub mod credentials;
pub mod format;
pub mod paths;
pub mod registry;
pub mod salt;
pub mod session;
pub mod user;

pub use credentials::CredentialStore;
pub use format::KeystoreState;
pub use paths::KeystorePaths;
pub use registry::{AlgorithmRegistry, RotationEvent};
pub use session::{KeystoreOptions, KeystoreSession};
pub use user::{validate_user_id, UserRecord, UserSummary};
