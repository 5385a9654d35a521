use std::path::{Path, PathBuf};

/// Locations of the files that make up one keystore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystorePaths {
    pub data_dir: PathBuf,
    pub keystore: PathBuf,
    pub salt: PathBuf,
    pub audit: PathBuf,
    pub lock: PathBuf,
}

impl KeystorePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            keystore: data_dir.join("keystore.bin"),
            salt: data_dir.join("salt.bin"),
            audit: data_dir.join("audit.log"),
            lock: data_dir.join("keystore.lock"),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Whether a keystore has been initialised in this directory.
    pub fn keystore_exists(&self) -> bool {
        self.keystore.exists()
    }
}
