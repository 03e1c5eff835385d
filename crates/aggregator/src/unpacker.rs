//! Artifact unpacker
//!
//! Extracts one named entry from an in-memory zip archive. Entries are
//! matched by exact name; the first match wins.

use std::io::{Cursor, Read};

use tracing::debug;

use crate::error::AggregatorError;

/// Default per-entry size limit (64 MiB).
pub const DEFAULT_MAX_ENTRY_SIZE: usize = 64 * 1024 * 1024;

/// Extracts a single entry from an artifact archive.
#[derive(Debug, Clone)]
pub struct ArtifactUnpacker {
    max_entry_size: usize,
}

impl Default for ArtifactUnpacker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRY_SIZE)
    }
}

impl ArtifactUnpacker {
    pub fn new(max_entry_size: usize) -> Self {
        Self { max_entry_size }
    }

    pub fn max_entry_size(&self) -> usize {
        self.max_entry_size
    }

    /// Returns the full contents of `entry_name`.
    ///
    /// # Errors
    ///
    /// - `ArchiveOpen`: the bytes are not a readable zip archive
    /// - `EntryNotFound`: no entry is named exactly `entry_name`
    /// - `ArtifactTooLarge`: the entry exceeds the size limit
    pub fn extract(&self, archive: &[u8], entry_name: &str) -> Result<Vec<u8>, AggregatorError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive))
            .map_err(|e| AggregatorError::ArchiveOpen(e.to_string()))?;

        // Match on central-directory names; only the requested entry is decoded.
        let index = (0..zip.len())
            .find(|&i| zip.name_for_index(i) == Some(entry_name))
            .ok_or_else(|| AggregatorError::EntryNotFound {
                entry: entry_name.to_owned(),
            })?;

        let entry = zip
            .by_index(index)
            .map_err(|e| AggregatorError::ArchiveOpen(format!("{entry_name}: {e}")))?;

        let declared = entry.size();
        if declared > self.max_entry_size as u64 {
            return Err(self.too_large(entry_name, declared));
        }

        // Declared sizes are not trusted; read at most one byte past the limit.
        let limit = self.max_entry_size as u64 + 1;
        let capacity = usize::try_from(declared).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        entry
            .take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| AggregatorError::ArchiveOpen(format!("{entry_name}: {e}")))?;
        if buf.len() > self.max_entry_size {
            return Err(self.too_large(entry_name, buf.len() as u64));
        }

        debug!(entry = entry_name, bytes = buf.len(), "extracted artifact entry");
        Ok(buf)
    }

    fn too_large(&self, entry_name: &str, size: u64) -> AggregatorError {
        AggregatorError::ArtifactTooLarge {
            entry: entry_name.to_owned(),
            size,
            max: self.max_entry_size,
        }
    }
}
