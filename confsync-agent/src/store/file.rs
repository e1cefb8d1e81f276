//! Filesystem storage backend.

use crate::error::StoreError;
use crate::store::StorageBackend;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Stores the record image in a single file.
///
/// A missing file loads as empty (first run); a short file is handed to
/// record validation, which resets it to the canonical empty record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a backend over the given path. The file is created on the
    /// first persist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorageBackend for FileStorage {
    fn load(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let n = bytes.len().min(buf.len());
                if n < buf.len() {
                    tracing::info!(path = %self.path.display(), "stored record is short, resetting");
                }
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn persist(&mut self, buf: &[u8]) -> Result<(), StoreError> {
        std::fs::write(&self.path, buf).map_err(StoreError::Persist)?;
        tracing::debug!(path = %self.path.display(), len = buf.len(), "record persisted");
        Ok(())
    }
}
