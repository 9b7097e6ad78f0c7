//! localvcs - local version history
//!
//! Persists a versioned tree of filesystem entries together with the log
//! of changes applied to it.
//!
//! # Quick Start
//!
//! ```no_run
//! use localvcs::{ChangeList, ChangeSet, Content, CreateFile, Entry, HistoryConfig, HistoryStorage, IdPath};
//!
//! # fn main() -> localvcs::Result<()> {
//! let storage = HistoryStorage::open("/tmp/history", HistoryConfig::default())?;
//! let body = Content::store(storage.contents(), b"fn main() {}")?;
//!
//! let mut root = Entry::root(vec![]);
//! let mut changes = ChangeList::new();
//! changes.commit(
//!     &mut root,
//!     ChangeSet::now(Some("create main.rs".into())).with_change(CreateFile {
//!         path: IdPath::new(vec![1]),
//!         name: "main.rs".into(),
//!         content: Some(body),
//!         timestamp: None,
//!     }),
//! )?;
//! storage.save(&root, &changes)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `localvcs-core`: ids, paths, content references, errors
//! - `localvcs-durability`: codecs, registries, entity model, history file

pub use localvcs_core::*;
pub use localvcs_durability::*;
