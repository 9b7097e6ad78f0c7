//! Core types for localvcs
//!
//! This crate defines the foundational types shared by every layer:
//! - IdPath: root-first address of a node in the versioned tree
//! - ContentId / Content: references to blobs in a content-addressable store
//! - ContentStore: the store seam, plus an in-memory implementation
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod content;
pub mod error;
pub mod id_path;

pub use content::{Content, ContentId, ContentStore, MemoryContentStore};
pub use error::{Error, Result};
pub use id_path::{IdPath, NodeId};
