//! Byte storage for uploaded files, keyed by file id.
//!
//! The pipeline only ever reads through [`BlobStore`]; upload and deletion
//! belong to the embedding application. Two implementations are provided:
//! an in-memory map and a one-file-per-blob directory layout.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::warn;

use crate::error::BlobError;

/// Read access to stored file bytes. Contents must be stable for the
/// lifetime of a processing run.
pub trait BlobStore: Send + Sync {
    /// Returns the stored bytes for `file_id`, or `None` when absent.
    fn get(&self, file_id: &str) -> Result<Option<Vec<u8>>, BlobError>;
}

// ─── In-memory implementation ───────────────────────────────────────────────

/// Map-backed blob store for tests and small embeddings.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, file_id: &str, bytes: Vec<u8>) {
        self.write_lock().insert(file_id.to_string(), bytes);
    }

    pub fn remove(&self, file_id: &str) {
        self.write_lock().remove(file_id);
    }

    pub fn clear(&self) {
        self.write_lock().clear();
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.read_lock().contains_key(file_id)
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        match self.blobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Blob store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        match self.blobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Blob store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, file_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.read_lock().get(file_id).cloned())
    }
}

// ─── Filesystem implementation ──────────────────────────────────────────────

/// One file per blob under a root directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (and creates if needed) the blob directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| BlobError::Write {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File ids may carry characters that are unsafe in file names.
    fn blob_path(&self, file_id: &str) -> PathBuf {
        let safe: String = file_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(safe)
    }

    pub fn put(&self, file_id: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.blob_path(file_id);
        fs::write(&path, bytes).map_err(|e| BlobError::Write { path, source: e })
    }

    pub fn remove(&self, file_id: &str) -> Result<(), BlobError> {
        let path = self.blob_path(file_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Write { path, source: e }),
        }
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.blob_path(file_id).exists()
    }

    /// Removes every stored blob. Subdirectories are left alone.
    pub fn clear(&self) -> Result<(), BlobError> {
        let entries = fs::read_dir(&self.root).map_err(|e| BlobError::Read {
            path: self.root.clone(),
            source: e,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| BlobError::Write { path, source: e })?;
            }
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, file_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.blob_path(file_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Read { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("missing").unwrap(), None);

        store.put("file-1", vec![1, 2, 3]);
        assert!(store.contains("file-1"));
        assert_eq!(store.get("file-1").unwrap(), Some(vec![1, 2, 3]));

        store.remove("file-1");
        assert_eq!(store.get("file-1").unwrap(), None);
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryBlobStore::new();
        store.put("a", vec![1]);
        store.put("b", vec![2]);
        store.clear();
        assert!(!store.contains("a"));
        assert!(!store.contains("b"));
    }

    #[test]
    fn test_fs_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path().join("blobs")).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);

        store.put("file-1", b"hello").unwrap();
        assert!(store.contains("file-1"));
        assert_eq!(store.get("file-1").unwrap(), Some(b"hello".to_vec()));

        store.remove("file-1").unwrap();
        assert_eq!(store.get("file-1").unwrap(), None);
        // Removing again is a no-op.
        store.remove("file-1").unwrap();
    }

    #[test]
    fn test_fs_store_sanitizes_file_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        store.put("case/42:upload", b"bytes").unwrap();
        assert_eq!(store.get("case/42:upload").unwrap(), Some(b"bytes".to_vec()));
        // The blob landed inside the root, not in a subdirectory.
        assert!(temp_dir.path().join("case_42_upload").exists());
    }

    #[test]
    fn test_fs_store_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();
        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        store.clear().unwrap();
        assert!(!store.contains("a"));
        assert!(!store.contains("b"));
    }
}
