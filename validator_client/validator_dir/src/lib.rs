//! On-disk lifecycle of the keystore + password + metadata triple each
//! validator owns (`spec.md` §2 "Keystore file manager", §4.5).
//!
//! This crate never decides *whether* a key should be removed — that's the
//! `validator_manager`/`commit_boost` delete flow's job (`spec.md` §4.5,
//! §4.8) — it only knows how to find and atomically remove the files that
//! back one public key once that decision has been made.

use slog::{debug, Logger};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `spec.md` §4.5: "Failure to remove any of them is surfaced as
    /// `IOError` with a message `"Error deleting keystore file: <cause>"`."
    #[error("Error deleting keystore file: {0}")]
    IOError(std::io::Error),
}

/// The three files a single validator's key material is spread across on
/// disk, rooted at a single keystore directory.
#[derive(Debug, Clone)]
pub struct KeystoreFiles {
    pub keystore_path: PathBuf,
    pub password_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
}

impl KeystoreFiles {
    pub fn new(keystore_path: PathBuf) -> Self {
        KeystoreFiles {
            keystore_path,
            password_path: None,
            metadata_path: None,
        }
    }

    pub fn with_password(mut self, path: PathBuf) -> Self {
        self.password_path = Some(path);
        self
    }

    pub fn with_metadata(mut self, path: PathBuf) -> Self {
        self.metadata_path = Some(path);
        self
    }

    /// Locates the keystore/password/metadata triple for `public_key` (a
    /// `0x`-prefixed lowercase hex identifier) under `key_store_path`,
    /// assuming the naming convention this service writes when it creates
    /// keys itself: `<public_key>.json`, `<public_key>.pass`,
    /// `<public_key>.yaml`. Callers that loaded a key from a differently
    /// named metadata file (the general case in `spec.md` §4.1's directory
    /// loading rules) should build a [`KeystoreFiles`] directly instead.
    pub fn conventional(key_store_path: &Path, public_key: &str) -> Self {
        let stripped = public_key.strip_prefix("0x").unwrap_or(public_key);
        KeystoreFiles {
            keystore_path: key_store_path.join(format!("{stripped}.json")),
            password_path: Some(key_store_path.join(format!("{stripped}.pass"))),
            metadata_path: Some(key_store_path.join(format!("{stripped}.yaml"))),
        }
    }

    /// Atomically (from the caller's point of view: all-or-error, no
    /// partial silent success) removes the keystore file, its password
    /// file, and its metadata file. A missing file is not an error — the
    /// triple may never have had all three (`spec.md` §4.5).
    pub fn delete(&self, log: &Logger) -> Result<(), Error> {
        remove_if_present(&self.keystore_path)?;
        if let Some(path) = &self.password_path {
            remove_if_present(path)?;
        }
        if let Some(path) = &self.metadata_path {
            remove_if_present(path)?;
        }
        debug!(log, "deleted keystore files"; "keystore" => self.keystore_path.display().to_string());
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IOError(e)),
    }
}

/// Writes `keystore`'s JSON document to `path`, fsyncing the file (and its
/// parent directory, where the platform supports it) before returning, so
/// that a crash immediately after `generate_proxy`/`add_validator` cannot
/// leave a truncated keystore on disk (`spec.md` §4.4 step 3 "fsync").
pub fn write_keystore_fsync(path: &Path, keystore: &eth2_keystore::Keystore) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::IOError)?;
    }
    let json = keystore
        .to_json_string()
        .map_err(|e| Error::IOError(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let file = fs::File::create(path).map_err(Error::IOError)?;
    {
        use std::io::Write;
        let mut file = &file;
        file.write_all(json.as_bytes()).map_err(Error::IOError)?;
    }
    file.sync_all().map_err(Error::IOError)?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn delete_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let files = KeystoreFiles::conventional(dir.path(), "0xabc");
        // None of the three files exist yet; deletion must still succeed.
        files.delete(&logging::null_logger()).unwrap();
    }

    #[test]
    fn delete_removes_all_three_files() {
        let dir = tempdir().unwrap();
        let files = KeystoreFiles::conventional(dir.path(), "0xabc");
        fs::write(&files.keystore_path, b"{}").unwrap();
        fs::write(files.password_path.as_ref().unwrap(), b"pw").unwrap();
        fs::write(files.metadata_path.as_ref().unwrap(), b"type: file-raw").unwrap();

        files.delete(&logging::null_logger()).unwrap();

        assert!(!files.keystore_path.exists());
        assert!(!files.password_path.unwrap().exists());
        assert!(!files.metadata_path.unwrap().exists());
    }

    #[test]
    fn write_keystore_fsync_round_trips() {
        let dir = tempdir().unwrap();
        let keystore = eth2_keystore::KeystoreBuilder::new(&[1u8; 32], b"pw")
            .build()
            .unwrap();
        let path = dir.path().join("key.json");
        write_keystore_fsync(&path, &keystore).unwrap();

        let reloaded = eth2_keystore::Keystore::from_file(&path).unwrap();
        assert_eq!(reloaded.decrypt(b"pw").unwrap(), vec![1u8; 32]);
    }
}
