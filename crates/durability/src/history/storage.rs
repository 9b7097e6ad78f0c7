//! Durable history storage
//!
//! A history directory holds one history file (the current tree plus the
//! change list, see [`format`](super::format)) and a `contents/`
//! directory with the blobs that entries and changes refer to.
//!
//! Saves replace the whole file atomically. A crash mid-save leaves the
//! previous history intact plus a temporary file that the next
//! [`HistoryStorage::open`] removes.

use super::config::{HistoryConfig, CONTENTS_DIR};
use super::format::{decode_file, encode_file, HistoryHeader, HEADER_SIZE};
use crate::atomic::{cleanup_temp_files, write_atomically};
use crate::content_store::DirContentStore;
use crate::model::{ChangeList, Entry};
use crate::stream::{StreamReader, StreamWriter};
use localvcs_core::{Error, Result};
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A loaded history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    /// Current tree
    pub root: Entry,
    /// Committed change sets, oldest first
    pub changes: ChangeList,
}

/// Information about a completed save
#[derive(Debug, Clone)]
pub struct SaveInfo {
    /// Final path of the history file
    pub path: PathBuf,
    /// History identity written to the header
    pub history_id: Uuid,
    /// File size in bytes
    pub bytes: u64,
    /// Footer checksum
    pub crc: u32,
    /// Number of change sets written
    pub change_sets: usize,
}

/// History file plus its content store
pub struct HistoryStorage {
    dir: PathBuf,
    config: HistoryConfig,
    contents: DirContentStore,
    history_id: Uuid,
}

impl HistoryStorage {
    /// Open (creating if needed) the history directory `dir`.
    ///
    /// Removes temporary files left by interrupted saves. An existing
    /// history keeps its id; a new one gets a fresh id. A history file
    /// whose header cannot be read (truncated, wrong magic, unsupported
    /// version) fails the open, so a later save never overwrites it.
    pub fn open(dir: impl Into<PathBuf>, config: HistoryConfig) -> Result<Self> {
        config.validate()?;
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let removed = cleanup_temp_files(&dir)?;
        if removed > 0 {
            warn!(dir = %dir.display(), removed, "Removed stale history temp files");
        }

        let contents = DirContentStore::open(dir.join(CONTENTS_DIR), config.durability.syncs())?;
        let path = dir.join(&config.file_name);
        let history_id = match read_header(&path)? {
            Some(header) => header.history_id,
            None => Uuid::new_v4(),
        };

        debug!(dir = %dir.display(), %history_id, "Opened history storage");
        Ok(HistoryStorage {
            dir,
            config,
            contents,
            history_id,
        })
    }

    /// History directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the history file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.config.file_name)
    }

    /// Active configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Store for file bodies referenced by this history
    pub fn contents(&self) -> &DirContentStore {
        &self.contents
    }

    /// Identity of this history
    pub fn history_id(&self) -> Uuid {
        self.history_id
    }

    /// True if a history file exists
    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Write `root` and `changes`, replacing any previous history
    pub fn save(&self, root: &Entry, changes: &ChangeList) -> Result<SaveInfo> {
        if !matches!(root, Entry::Root(_)) {
            return Err(Error::InvalidOperation(
                "history tree must start at a root entry".into(),
            ));
        }

        let mut payload: Vec<u8> = Vec::new();
        {
            let mut out = StreamWriter::new(&mut payload);
            out.write_entry(root)?;
            out.write_change_list(changes)?;
            out.flush()?;
        }

        let (bytes, crc) = encode_file(self.history_id, &payload);
        write_atomically(
            &self.dir,
            &self.config.file_name,
            &bytes,
            self.config.durability.syncs(),
        )?;

        let info = SaveInfo {
            path: self.path(),
            history_id: self.history_id,
            bytes: bytes.len() as u64,
            crc,
            change_sets: changes.len(),
        };
        info!(
            path = %info.path.display(),
            bytes = info.bytes,
            change_sets = info.change_sets,
            "History saved"
        );
        Ok(info)
    }

    /// Read the saved history, or `None` if nothing was saved yet
    pub fn load(&self) -> Result<Option<History>> {
        let path = self.path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (header, payload) = decode_file(&bytes, self.config.verify_checksums)?;
        if header.history_id != self.history_id {
            // The file was replaced after open.
            warn!(
                expected = %self.history_id,
                found = %header.history_id,
                "History id changed on disk"
            );
        }

        let mut cursor = Cursor::new(payload);
        let (root, changes) = {
            let mut input = StreamReader::new(&mut cursor, &self.contents);
            let root = input.read_entry()?;
            let changes = input.read_change_list()?;
            (root, changes)
        };
        if cursor.position() as usize != payload.len() {
            return Err(Error::Corruption(
                "trailing bytes after change list".into(),
            ));
        }
        if !matches!(root, Entry::Root(_)) {
            return Err(Error::Corruption(
                "history tree does not start at a root entry".into(),
            ));
        }

        debug!(
            path = %path.display(),
            entries = root.entry_count(),
            change_sets = changes.len(),
            "History loaded"
        );
        Ok(Some(History { root, changes }))
    }

    /// Remove temporary files left by interrupted saves
    pub fn cleanup_temp_files(&self) -> Result<usize> {
        Ok(cleanup_temp_files(&self.dir)?)
    }
}

fn read_header(path: &Path) -> Result<Option<HistoryHeader>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = [0u8; HEADER_SIZE];
    file.read_exact(&mut buf)
        .map_err(|e| Error::from_read(e, "history header"))?;
    HistoryHeader::from_bytes(&buf).map(Some)
}
