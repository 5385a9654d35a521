//! Crash-safe file replacement.
//!
//! A write goes through two steps:
//!
//! 1. `StagedWrite::stage` creates a uniquely named temp file next to the
//!    destination (create-new, owner-only permissions), writes the data
//!    and fsyncs it.
//! 2. `StagedWrite::commit` renames the temp file over the destination and
//!    fsyncs the parent directory so the rename itself is durable.
//!
//! Until `commit` returns, the destination still holds its previous
//! content.  A staged write that is dropped without committing removes
//! its temp file; one abandoned by a crash is left behind and cleaned up
//! by `remove_stale_temp_files`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::RngCore;
use tracing::{debug, warn};

use crate::errors::{CipherVaultError, Result};

/// Infix that marks temp files belonging to a destination.
const TMP_MARKER: &str = ".tmp.";

/// A fully written, fsynced temp file waiting to replace its destination.
#[derive(Debug)]
pub struct StagedWrite {
    tmp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Write `data` to a fresh temp file in the destination's directory.
    pub fn stage(target: &Path, data: &[u8]) -> Result<Self> {
        let parent = parent_dir(target);
        fs::create_dir_all(parent)?;

        let tmp_path = random_tmp_path(target)?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut tmp_file = options.open(&tmp_path).map_err(|e| {
            CipherVaultError::Storage(format!(
                "failed to create temporary file {}: {e}",
                tmp_path.display()
            ))
        })?;

        let staged = Self {
            tmp_path,
            target: target.to_path_buf(),
            committed: false,
        };

        // If either call fails, dropping `staged` removes the temp file.
        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;

        Ok(staged)
    }

    /// Path of the temp file holding the staged content.
    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Atomically replace the destination with the staged content.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp_path, &self.target).map_err(|e| {
            CipherVaultError::Storage(format!(
                "atomic rename onto {} failed: {e}",
                self.target.display()
            ))
        })?;
        self.committed = true;

        sync_dir(parent_dir(&self.target))?;
        debug!(path = %self.target.display(), "committed atomic write");
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Write `data` to `path` atomically: readers see either the old or the
/// new content, never a partial file.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    StagedWrite::stage(path, data)?.commit()
}

/// Delete temp files left behind by interrupted writes to `target`.
///
/// Returns how many were removed.  Failures are logged and skipped; a
/// stale temp file never affects the destination.
pub fn remove_stale_temp_files(target: &Path) -> usize {
    let Some(prefix) = tmp_prefix(target) else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(parent_dir(target)) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(&prefix) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "could not remove stale temp file"),
        }
    }
    if removed > 0 {
        debug!(removed, target = %target.display(), "removed stale temp files");
    }
    removed
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// `.<file name>.tmp.` — the shared prefix of every temp file for `target`.
fn tmp_prefix(target: &Path) -> Option<String> {
    let name = target.file_name()?.to_string_lossy();
    Some(format!(".{name}{TMP_MARKER}"))
}

/// Temp path in the same directory with 64 bits of randomness in the name.
fn random_tmp_path(target: &Path) -> Result<PathBuf> {
    let prefix = tmp_prefix(target).ok_or_else(|| {
        CipherVaultError::Storage(format!("{} has no file name", target.display()))
    })?;

    let mut buf = [0u8; 8];
    rand::rng().fill_bytes(&mut buf);
    let suffix: String = buf.iter().map(|b| format!("{b:02x}")).collect();

    Ok(parent_dir(target).join(format!("{prefix}{suffix}")))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
