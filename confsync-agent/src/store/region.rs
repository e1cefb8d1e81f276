//! Fixed-region storage backend.
//!
//! The device analog is an EEPROM-style medium shared with other
//! subsystems: the record occupies a reserved window at a fixed offset
//! and everything outside the window belongs to someone else. Backed by
//! a file here; persist rewrites only the record's window.

use crate::error::StoreError;
use crate::store::StorageBackend;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Stores the record image at a fixed offset inside a file.
///
/// Bytes before and after the record window are preserved across
/// persists. A missing file or a file too short to cover the window
/// loads as empty.
#[derive(Debug, Clone)]
pub struct FileRegionStorage {
    path: PathBuf,
    offset: usize,
}

impl FileRegionStorage {
    /// Create a backend over the given path and byte offset.
    pub fn new(path: impl Into<PathBuf>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

impl StorageBackend for FileRegionStorage {
    fn load(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let region = bytes.get(self.offset..).unwrap_or(&[]);
                let n = region.len().min(buf.len());
                if n < buf.len() {
                    tracing::info!(
                        path = %self.path.display(),
                        offset = self.offset,
                        "stored region is short, resetting"
                    );
                }
                buf[..n].copy_from_slice(&region[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn persist(&mut self, buf: &[u8]) -> Result<(), StoreError> {
        let mut bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::Persist(e)),
        };

        let end = self.offset + buf.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[self.offset..end].copy_from_slice(buf);

        std::fs::write(&self.path, &bytes).map_err(StoreError::Persist)?;
        tracing::debug!(
            path = %self.path.display(),
            offset = self.offset,
            len = buf.len(),
            "record region persisted"
        );
        Ok(())
    }
}
