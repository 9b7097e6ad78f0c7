//! Persisted entity model
//!
//! - [`Entry`]: node of the versioned tree (root, directory, file)
//! - [`Change`]: one recorded mutation, addressed by [`IdPath`]
//! - [`ChangeSet`]: changes committed together as one unit
//! - [`ChangeList`]: the append-only log of change sets
//!
//! The tree and the log are owned separately. Changes refer to entries
//! only by path, so a change can be decoded without the tree it applies to.
//!
//! [`IdPath`]: localvcs_core::IdPath

pub mod change;
pub mod change_list;
pub mod change_set;
pub mod entry;

pub use change::{
    Change, ChangeFileContent, CreateDirectory, CreateFile, Delete, Move, Rename,
};
pub use change_list::ChangeList;
pub use change_set::ChangeSet;
pub use entry::{DirectoryEntry, Entry, FileEntry, RootEntry};
