//! Durable file primitives used by the keystore.
//!
//! - `atomic` writes a file via temp-file + fsync + rename.
//! - `lock` holds an advisory exclusive lock for the session lifetime.

pub mod atomic;
pub mod lock;

pub use atomic::{remove_stale_temp_files, write_atomic, StagedWrite};
pub use lock::KeystoreLock;
