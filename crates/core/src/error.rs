//! Error types for localvcs
//!
//! Every layer shares this error type. We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.

use crate::id_path::IdPath;
use std::io;
use thiserror::Error;

/// Result type alias for localvcs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the history engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying source or sink
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// The input ended before a declared length, tag or value was satisfied
    #[error("Truncated input while reading {context}")]
    TruncatedInput {
        /// What was being read when the input ran out
        context: &'static str,
    },

    /// A type tag with no registered decoder
    #[error("Unknown {family} type tag: {tag:?}")]
    UnknownTag {
        /// Polymorphic family ("entry" or "change")
        family: &'static str,
        /// The tag read from the stream
        tag: String,
    },

    /// The same tag was registered twice in one family
    #[error("Duplicate {family} type tag: {tag:?}")]
    DuplicateTag {
        /// Polymorphic family ("entry" or "change")
        family: &'static str,
        /// The conflicting tag
        tag: String,
    },

    /// Data corruption detected
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// File was written by an incompatible format version
    #[error("Unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found on disk
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// No entry lives at the given path
    #[error("Entry not found: {0}")]
    EntryNotFound(IdPath),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Map an I/O error raised while reading `context`.
    ///
    /// `UnexpectedEof` becomes [`Error::TruncatedInput`]; everything else
    /// is propagated verbatim.
    pub fn from_read(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput { context }
        } else {
            Error::IoError(err)
        }
    }

    /// True for [`Error::TruncatedInput`]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::TruncatedInput { .. })
    }

    /// True for [`Error::UnknownTag`]
    pub fn is_unknown_tag(&self) -> bool {
        matches!(self, Error::UnknownTag { .. })
    }
}
