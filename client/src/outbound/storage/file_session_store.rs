//! Durable session storage on disk.
//!
//! Each key is one file named after the key inside a capability-scoped
//! directory. Writes go to a staging file first and are renamed into place,
//! so readers never observe a half-written token or profile.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::ports::{SessionStore, SessionStoreError, StorageKey};

/// [`SessionStore`] backed by files in one directory.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: Dir,
    path: PathBuf,
}

impl FileSessionStore {
    /// Open `path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        Dir::create_ambient_dir_all(&path, ambient_authority())
            .map_err(|error| io_error(&path, "create", &error))?;
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .map_err(|error| io_error(&path, "open", &error))?;
        Ok(Self { dir, path })
    }

    /// Directory holding the session files.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, SessionStoreError> {
        match self.dir.read_to_string(key.as_str()) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(&self.file_path(key.as_str()), "read", &error)),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), SessionStoreError> {
        let staged = format!(".{}.tmp", key.as_str());
        self.dir
            .write(&staged, value.as_bytes())
            .map_err(|error| io_error(&self.file_path(&staged), "write", &error))?;
        self.dir
            .rename(&staged, &self.dir, key.as_str())
            .map_err(|error| io_error(&self.file_path(key.as_str()), "replace", &error))?;
        debug!(key = key.as_str(), "session key written");
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), SessionStoreError> {
        match self.dir.remove_file(key.as_str()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&self.file_path(key.as_str()), "remove", &error)),
        }
    }
}

fn io_error(path: &Path, action: &str, error: &io::Error) -> SessionStoreError {
    SessionStoreError::io(format!("{action} {}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[rstest]
    fn missing_keys_read_as_absent(temp_dir: TempDir) {
        let store = FileSessionStore::open(temp_dir.path()).expect("open store");
        assert_eq!(store.get(StorageKey::Token).expect("read"), None);
        store.remove(StorageKey::User).expect("removing absent key succeeds");
    }

    #[rstest]
    fn values_survive_reopening(temp_dir: TempDir) {
        let first = FileSessionStore::open(temp_dir.path()).expect("open store");
        first.set(StorageKey::Token, "t1").expect("write token");
        first.set(StorageKey::Token, "t2").expect("overwrite token");
        drop(first);

        let second = FileSessionStore::open(temp_dir.path()).expect("reopen store");
        assert_eq!(second.get(StorageKey::Token).expect("read").as_deref(), Some("t2"));
        let staged = temp_dir.path().join(".token.tmp");
        assert!(!staged.exists(), "staging file must be renamed away");
    }

    #[rstest]
    fn clear_removes_both_files(temp_dir: TempDir) {
        let store = FileSessionStore::open(temp_dir.path().join("nested/session")).expect("open");
        store.set(StorageKey::Token, "t1").expect("write token");
        store
            .set(StorageKey::User, r#"{"id":"1","username":"alice"}"#)
            .expect("write user");

        store.clear().expect("clear");

        assert_eq!(store.get(StorageKey::Token).expect("read"), None);
        assert_eq!(store.get(StorageKey::User).expect("read"), None);
        assert!(store.path().ends_with("nested/session"));
    }
}
