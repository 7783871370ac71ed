//! Persistence boundary for the cart engine.
//!
//! The engine treats durability as a consumed capability: an opaque blob
//! store holding one serialized cart payload. [`CartStorage`] is the whole
//! contract. Two implementations ship with the crate:
//!
//! - [`MemoryStorage`] for tests and embedders that manage durability
//!   themselves.
//! - [`FileStorage`] for local single-process durability: an advisory
//!   exclusive lock taken at open (the persisted blob is owned by exactly
//!   one process) and atomic temp-file-then-rename writes so a crash leaves
//!   either the old payload or the new one, never a torn file.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Errors from the persistence boundary.
///
/// These never propagate through cart mutations; the store catches them,
/// logs, and continues with the in-memory model as the source of truth.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage read failed: {0}")]
    Read(#[source] io::Error),

    #[error("storage write failed: {0}")]
    Write(#[source] io::Error),

    #[error("storage file locked by another process: {}", .0.display())]
    Locked(PathBuf),
}

/// Opaque single-blob store consumed by the cart engine.
pub trait CartStorage {
    /// Read the persisted payload, `None` if nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] when the backing medium fails; callers
    /// degrade this to "no prior cart".
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replace the persisted payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] when the backing medium fails; callers
    /// log and continue with un-persisted in-memory state.
    fn write(&mut self, payload: &str) -> Result<(), StorageError>;
}

/// In-memory storage: the payload lives and dies with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    payload: Option<String>,
}

impl MemoryStorage {
    #[must_use]
    pub const fn new() -> Self {
        Self { payload: None }
    }

    /// Start pre-seeded, as if a prior session had persisted `payload`.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    /// Current payload, for inspection in tests and embedders.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.payload.clone())
    }

    fn write(&mut self, payload: &str) -> Result<(), StorageError> {
        self.payload = Some(payload.to_string());
        Ok(())
    }
}

/// File-backed storage with single-process ownership.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Advisory exclusive lock, held until drop. The handle releases the
    // lock when it closes.
    _lock: File,
}

impl FileStorage {
    /// Open (or create the parent directory for) a cart file and take the
    /// advisory exclusive lock on its companion `.lock` file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] when another process already holds
    /// the lock, or [`StorageError::Write`] when the lock file cannot be
    /// created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::Write)?;
            }
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(StorageError::Write)?;
        lock.try_lock_exclusive()
            .map_err(|_| StorageError::Locked(lock_path))?;

        Ok(Self { path, _lock: lock })
    }

    /// Path of the cart file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Read(err)),
        }
    }

    fn write(&mut self, payload: &str) -> Result<(), StorageError> {
        // Write-then-rename keeps the previous payload intact if the write
        // is interrupted.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload).map_err(StorageError::Write)?;
        fs::rename(&tmp_path, &self.path).map_err(StorageError::Write)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CartStorage, FileStorage, MemoryStorage, StorageError};

    #[test]
    fn memory_storage_roundtrips() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read().expect("read"), None);

        storage.write("[]").expect("write");
        assert_eq!(storage.read().expect("read").as_deref(), Some("[]"));
        assert_eq!(storage.payload(), Some("[]"));
    }

    #[test]
    fn file_storage_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cart.json");

        let mut storage = FileStorage::open(&path).expect("open");
        assert_eq!(storage.read().expect("read"), None);

        storage.write(r#"[{"key":"a"}]"#).expect("write");
        assert_eq!(
            storage.read().expect("read").as_deref(),
            Some(r#"[{"key":"a"}]"#)
        );
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cart.json");

        {
            let mut storage = FileStorage::open(&path).expect("open");
            storage.write("[1,2,3]").expect("write");
        }

        let storage = FileStorage::open(&path).expect("reopen");
        assert_eq!(storage.read().expect("read").as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn file_storage_creates_missing_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/cart.json");

        let mut storage = FileStorage::open(&path).expect("open");
        storage.write("[]").expect("write");
        assert!(path.exists());
    }

    #[test]
    fn second_open_is_refused_while_locked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cart.json");

        let _held = FileStorage::open(&path).expect("open");
        let second = FileStorage::open(&path);
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }

    #[test]
    fn blank_file_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cart.json");
        std::fs::write(&path, "  \n").expect("seed file");

        let storage = FileStorage::open(&path).expect("open");
        assert_eq!(storage.read().expect("read"), None);
    }
}
