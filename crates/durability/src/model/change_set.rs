//! Change sets
//!
//! A change set groups the changes made by one command. It is applied
//! atomically: either every change succeeds or the tree is untouched.
//!
//! ```text
//! [label: nullable string][timestamp: nullable i64][count: u32][changes...]
//! ```

use crate::codec::MAX_PREALLOCATED_ITEMS;
use crate::stream::{Persistent, StreamReader, StreamWriter};
use localvcs_core::Result;
use tracing::debug;

use super::change::Change;
use super::entry::Entry;

/// Changes committed as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Human-readable label (e.g. the command name)
    pub label: Option<String>,
    /// Commit time, epoch millis
    pub timestamp: Option<i64>,
    /// Changes in application order
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Empty change set
    pub fn new(label: Option<String>, timestamp: Option<i64>) -> Self {
        ChangeSet {
            label,
            timestamp,
            changes: Vec::new(),
        }
    }

    /// Empty change set stamped with the current wall-clock time
    pub fn now(label: Option<String>) -> Self {
        Self::new(label, Some(chrono::Utc::now().timestamp_millis()))
    }

    /// Append a change
    pub fn push(&mut self, change: impl Into<Change>) {
        self.changes.push(change.into());
    }

    /// Builder form of [`ChangeSet::push`]
    pub fn with_change(mut self, change: impl Into<Change>) -> Self {
        self.push(change);
        self
    }

    /// Number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True for a no-op change set
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every change in order.
    ///
    /// Changes run against a working copy that replaces `root` only when
    /// all of them succeed.
    pub fn apply_to(&self, root: &mut Entry) -> Result<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        let mut working = root.clone();
        for (index, change) in self.changes.iter().enumerate() {
            change.apply_to(&mut working).map_err(|e| {
                debug!(
                    label = ?self.label,
                    index,
                    path = %change.affected_path(),
                    error = %e,
                    "Change set rejected"
                );
                e
            })?;
        }
        *root = working;
        Ok(())
    }
}

impl Persistent for ChangeSet {
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_nullable_string(self.label.as_deref())?;
        out.write_long(self.timestamp)?;
        out.write_count(self.changes.len())?;
        for change in &self.changes {
            out.write_change(change)?;
        }
        Ok(())
    }

    fn read_from(input: &mut StreamReader<'_>) -> Result<Self> {
        let label = input.read_nullable_string()?;
        let timestamp = input.read_long()?;
        let count = input.read_count("change count")?;
        let mut changes = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
        for _ in 0..count {
            changes.push(input.read_change()?);
        }
        Ok(ChangeSet {
            label,
            timestamp,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateDirectory, CreateFile, Delete};
    use crate::stream::{from_bytes, to_bytes};
    use localvcs_core::{Error, IdPath, MemoryContentStore};

    #[test]
    fn test_empty_change_set_roundtrip() {
        let store = MemoryContentStore::new();
        let noop = ChangeSet::new(Some("noop".into()), Some(1000));
        let bytes = to_bytes(&noop).unwrap();
        let decoded: ChangeSet = from_bytes(&bytes, &store).unwrap();
        assert_eq!(decoded, noop);
        assert!(decoded.changes.is_empty());
    }

    #[test]
    fn test_empty_change_set_layout() {
        let noop = ChangeSet::new(Some("noop".into()), Some(1000));
        let bytes = to_bytes(&noop).unwrap();
        assert_eq!(
            bytes,
            vec![
                1, 0, 0, 0, 4, b'n', b'o', b'o', b'p', // label
                1, 0, 0, 0, 0, 0, 0, 0x03, 0xE8, // timestamp
                0, 0, 0, 0, // count
            ]
        );
    }

    #[test]
    fn test_unlabelled_roundtrip_preserves_order() {
        let store = MemoryContentStore::new();
        let set = ChangeSet::new(None, None)
            .with_change(CreateDirectory {
                path: IdPath::new(vec![1]),
                name: "a".into(),
            })
            .with_change(Delete {
                path: IdPath::new(vec![1]),
            });
        let decoded: ChangeSet = from_bytes(&to_bytes(&set).unwrap(), &store).unwrap();
        assert_eq!(decoded, set);
        assert!(matches!(decoded.changes[1], Change::Delete(_)));
    }

    #[test]
    fn test_now_sets_timestamp() {
        let set = ChangeSet::now(Some("edit".into()));
        assert!(set.timestamp.unwrap() > 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut root = Entry::root(vec![]);
        let set = ChangeSet::new(Some("partial".into()), None)
            .with_change(CreateDirectory {
                path: IdPath::new(vec![1]),
                name: "ok".into(),
            })
            .with_change(CreateFile {
                path: IdPath::new(vec![9, 2]),
                name: "orphan".into(),
                content: None,
                timestamp: None,
            });

        let result = set.apply_to(&mut root);
        assert!(matches!(result, Err(Error::EntryNotFound(_))));
        assert_eq!(root, Entry::root(vec![]));
    }

    #[test]
    fn test_later_changes_see_earlier_ones() {
        let mut root = Entry::root(vec![]);
        let set = ChangeSet::new(None, None)
            .with_change(CreateDirectory {
                path: IdPath::new(vec![1]),
                name: "src".into(),
            })
            .with_change(CreateFile {
                path: IdPath::new(vec![1, 2]),
                name: "lib.rs".into(),
                content: None,
                timestamp: None,
            });
        set.apply_to(&mut root).unwrap();
        assert_eq!(root.entry_count(), 3);
    }
}
