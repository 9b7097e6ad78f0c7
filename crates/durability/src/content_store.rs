//! Directory-backed content store
//!
//! One file per blob, named by the hex [`ContentId`]. Blobs are written
//! once through [`write_atomically`]; storing the same bytes again is a
//! no-op. Storing different bytes under an existing id is corruption.

use crate::atomic::{cleanup_temp_files, write_atomically};
use localvcs_core::{ContentId, ContentStore, Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Content store rooted at a directory
#[derive(Debug, Clone)]
pub struct DirContentStore {
    dir: PathBuf,
    sync: bool,
}

impl DirContentStore {
    /// Open (creating if needed) a store in `dir`
    pub fn open(dir: impl Into<PathBuf>, sync: bool) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let removed = cleanup_temp_files(&dir)?;
        if removed > 0 {
            warn!(dir = %dir.display(), removed, "Removed partial content blobs");
        }
        Ok(DirContentStore { dir, sync })
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, id: ContentId) -> PathBuf {
        self.dir.join(id.to_string())
    }

    fn verify_existing(&self, id: ContentId, bytes: &[u8]) -> Result<ContentId> {
        let existing = std::fs::read(self.blob_path(id))?;
        if existing != bytes {
            return Err(Error::Corruption(format!(
                "content blob {} already holds different bytes",
                id
            )));
        }
        Ok(id)
    }
}

impl ContentStore for DirContentStore {
    fn store(&self, bytes: &[u8]) -> Result<ContentId> {
        let id = ContentId::of(bytes);
        if self.blob_path(id).exists() {
            return self.verify_existing(id, bytes);
        }
        if let Err(e) = write_atomically(&self.dir, &id.to_string(), bytes, self.sync) {
            // A concurrent store of the same bytes may have won the rename.
            return match self.resolve(id) {
                Ok(Some(existing)) if &existing[..] == bytes => Ok(id),
                _ => Err(e.into()),
            };
        }
        debug!(%id, len = bytes.len(), "Stored content blob");
        Ok(id)
    }

    fn resolve(&self, id: ContentId) -> Result<Option<Arc<[u8]>>> {
        let bytes = match std::fs::read(self.blob_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if ContentId::of(&bytes) != id {
            return Err(Error::Corruption(format!("content blob {} does not match its id", id)));
        }
        Ok(Some(Arc::from(bytes)))
    }

    fn contains(&self, id: ContentId) -> Result<bool> {
        Ok(self.blob_path(id).exists())
    }
}
