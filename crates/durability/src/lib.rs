//! Persistence layer for localvcs
//!
//! This crate handles everything that touches bytes or disk:
//!
//! - Primitive and path codecs (nullable values with presence flags)
//! - Type registries for the two polymorphic families, Entry and Change
//! - Entity model: Entry tree, Change, ChangeSet, ChangeList
//! - Stream façade that composes the codecs for nested decoding
//! - Directory-backed content store
//! - History file: atomic save/load with checksum and versioned header

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic; // Crash-safe file replacement
pub mod codec; // Primitive and IdPath codecs
pub mod content_store; // One-file-per-blob content store
pub mod history; // History file format, config and storage
pub mod model; // Entry, Change, ChangeSet, ChangeList
pub mod registry; // Tag → decoder tables
pub mod stream; // StreamReader / StreamWriter

// === Re-exports ===
pub use content_store::DirContentStore;
pub use history::{
    ConfigError, DurabilityMode, History, HistoryConfig, HistoryStorage, SaveInfo,
};
pub use model::{
    Change, ChangeFileContent, ChangeList, ChangeSet, CreateDirectory, CreateFile, Delete,
    DirectoryEntry, Entry, FileEntry, Move, Rename, RootEntry,
};
pub use registry::{DecodeFn, Polymorphic, RegistryError, TypeRegistry, Variant};
pub use stream::{
    from_bytes, to_bytes, Persistent, StreamReader, StreamWriter, MAX_ENTRY_DEPTH,
};
