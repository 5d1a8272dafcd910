//! Session token persisted to a file.
//!
//! The file is read on every `authorization` call so that a login in one
//! process is seen by the next. Each write goes to its own uniquely named
//! sibling temp file that is then renamed over the target, so a reader never
//! sees a partial token, even with several writers at once. The file is
//! readable by its owner only.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bookshelf_core::{CredentialProvider, StoreError, TokenStore};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/bookshelf/token`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("bookshelf").join("token"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl CredentialProvider for FileTokenStore {
    fn authorization(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable token file");
                None
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn store(&self, value: &str) -> Result<(), StoreError> {
        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| StoreError::io("failed to create token directory", e))?;

        let mut temp =
            NamedTempFile::new_in(dir).map_err(|e| StoreError::io("failed to create token file", e))?;
        restrict_to_owner(temp.as_file())
            .map_err(|e| StoreError::io("failed to set token file permissions", e))?;
        temp.write_all(value.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| StoreError::io("failed to write token file", e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io("failed to replace token file", e.error))?;
        tracing::debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("failed to remove token file", e)),
        }
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_logged_out() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        assert_eq!(store.authorization(), None);
    }

    #[test]
    fn store_creates_parent_dirs_and_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        store.store("Bearer abc").unwrap();
        assert_eq!(store.authorization().as_deref(), Some("Bearer abc"));
        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["token".to_string()], "temp file left behind");

        store.store("Bearer def").unwrap();
        assert_eq!(store.authorization().as_deref(), Some("Bearer def"));
    }

    #[test]
    fn blank_file_means_logged_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(FileTokenStore::new(path).authorization(), None);
    }

    #[test]
    fn reads_changes_made_by_another_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        let reader = FileTokenStore::new(&path);
        let writer = FileTokenStore::new(&path);

        writer.store("Bearer xyz").unwrap();
        assert_eq!(reader.authorization().as_deref(), Some("Bearer xyz"));
        writer.clear().unwrap();
        assert_eq!(reader.authorization(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.clear().unwrap();
        store.store("Bearer abc").unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.authorization(), None);
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.store("Bearer abc").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn concurrent_writers_never_expose_partial_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        let a = format!("Bearer {}", "a".repeat(200 * 1024));
        let b = format!("Bearer {}", "b".repeat(200 * 1024));

        std::thread::scope(|scope| {
            let writers: Vec<_> = [&a, &b]
                .into_iter()
                .map(|token| {
                    let store = FileTokenStore::new(&path);
                    scope.spawn(move || {
                        for _ in 0..50 {
                            store.store(token).unwrap();
                        }
                    })
                })
                .collect();

            let reader = FileTokenStore::new(&path);
            for _ in 0..2_000 {
                if let Some(seen) = reader.authorization() {
                    assert!(seen == a || seen == b, "reader saw a partial or mixed token");
                }
            }

            for writer in writers {
                writer.join().unwrap();
            }
        });

        let last = FileTokenStore::new(&path).authorization().unwrap();
        assert!(last == a || last == b);
    }
}
