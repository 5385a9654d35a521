//! Advisory exclusive lock on the keystore directory.
//!
//! Only one process may hold a keystore open at a time.  The lock is an
//! `flock(LOCK_EX | LOCK_NB)` on a dedicated lock file and is released when
//! the `KeystoreLock` (and with it the file descriptor) is dropped, or when
//! the process dies.  On non-Unix targets locking is a no-op.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{CipherVaultError, Result};

/// A held advisory lock.  Dropping it releases the lock.
#[derive(Debug)]
pub struct KeystoreLock {
    path: PathBuf,
    _file: File,
}

impl KeystoreLock {
    /// Try to take the lock without blocking.
    ///
    /// Fails with `KeystoreLocked` if another handle already holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        try_lock_exclusive(&file).map_err(|e| {
            debug!(path = %path.display(), error = %e, "keystore lock is held elsewhere");
            CipherVaultError::KeystoreLocked(path.to_path_buf())
        })?;

        debug!(path = %path.display(), "acquired keystore lock");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the
    // duration of the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_lock_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystore.lock");

        let lock = KeystoreLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(lock.path(), path);
    }

    #[cfg(unix)]
    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystore.lock");

        let _held = KeystoreLock::acquire(&path).unwrap();
        let err = KeystoreLock::acquire(&path).unwrap_err();
        assert!(matches!(err, CipherVaultError::KeystoreLocked(_)));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystore.lock");

        drop(KeystoreLock::acquire(&path).unwrap());
        assert!(KeystoreLock::acquire(&path).is_ok());
    }
}
