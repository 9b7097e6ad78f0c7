//! The history log
//!
//! ```text
//! [count: u32][change sets, in commit order]
//! ```
//!
//! Node ids are never reused. Once a path in the log has named an id, a
//! later create of that id is rejected even if the node was deleted in
//! between, so every recorded path keeps meaning one node across the
//! whole history.

use crate::codec::MAX_PREALLOCATED_ITEMS;
use crate::stream::{Persistent, StreamReader, StreamWriter};
use localvcs_core::{Error, NodeId, Result};
use std::collections::HashSet;

use super::change::Change;
use super::change_set::ChangeSet;
use super::entry::Entry;

/// Append-only log of change sets, oldest first
#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    change_sets: Vec<ChangeSet>,
    /// Every id named by a path in `change_sets`
    seen_ids: HashSet<NodeId>,
}

// `seen_ids` is derived from `change_sets`.
impl PartialEq for ChangeList {
    fn eq(&self, other: &Self) -> bool {
        self.change_sets == other.change_sets
    }
}

impl Eq for ChangeList {}

impl ChangeList {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change set without applying or checking it
    pub fn push(&mut self, change_set: ChangeSet) {
        record_ids(&mut self.seen_ids, &change_set);
        self.change_sets.push(change_set);
    }

    /// Apply `change_set` to `root`, then append it.
    ///
    /// Creating an id that an earlier change already named is an
    /// [`Error::InvalidOperation`]. Nothing is recorded if the change set
    /// is rejected.
    pub fn commit(&mut self, root: &mut Entry, change_set: ChangeSet) -> Result<()> {
        check_fresh_ids(&self.seen_ids, &change_set)?;
        change_set.apply_to(root)?;
        self.push(change_set);
        Ok(())
    }

    /// True if some recorded change names `id`
    pub fn has_used_id(&self, id: NodeId) -> bool {
        self.seen_ids.contains(&id)
    }

    /// Change sets in commit order
    pub fn iter(&self) -> std::slice::Iter<'_, ChangeSet> {
        self.change_sets.iter()
    }

    /// Number of change sets
    pub fn len(&self) -> usize {
        self.change_sets.len()
    }

    /// True if nothing was committed
    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }

    /// Change set at `index`
    pub fn get(&self, index: usize) -> Option<&ChangeSet> {
        self.change_sets.get(index)
    }

    /// Most recent change set
    pub fn last(&self) -> Option<&ChangeSet> {
        self.change_sets.last()
    }

    /// Tree state after replaying the first `count` change sets on `base`
    pub fn replay(&self, base: &Entry, count: usize) -> Result<Entry> {
        if count > self.change_sets.len() {
            return Err(Error::InvalidOperation(format!(
                "cannot replay {} change sets, history holds {}",
                count,
                self.change_sets.len()
            )));
        }
        let mut seen = HashSet::new();
        collect_tree_ids(base, &mut seen);
        let mut root = base.clone();
        for change_set in &self.change_sets[..count] {
            check_fresh_ids(&seen, change_set)?;
            change_set.apply_to(&mut root)?;
            record_ids(&mut seen, change_set);
        }
        Ok(root)
    }
}

/// Leaf id of a create, the only changes that bring an id into the tree
fn created_id(change: &Change) -> Option<NodeId> {
    match change {
        Change::CreateFile(c) => c.path.leaf(),
        Change::CreateDirectory(c) => c.path.leaf(),
        _ => None,
    }
}

fn record_change_ids(seen: &mut HashSet<NodeId>, change: &Change) {
    seen.extend(change.affected_path().ids().iter().copied());
    if let Change::Move(m) = change {
        seen.extend(m.new_parent.ids().iter().copied());
    }
}

fn record_ids(seen: &mut HashSet<NodeId>, change_set: &ChangeSet) {
    for change in &change_set.changes {
        record_change_ids(seen, change);
    }
}

/// Reject creates of ids already named earlier in the log or the set
fn check_fresh_ids(seen: &HashSet<NodeId>, change_set: &ChangeSet) -> Result<()> {
    let mut named: HashSet<NodeId> = HashSet::new();
    for change in &change_set.changes {
        if let Some(id) = created_id(change) {
            if seen.contains(&id) || named.contains(&id) {
                return Err(Error::InvalidOperation(format!(
                    "id {} was already used in this history",
                    id
                )));
            }
        }
        record_change_ids(&mut named, change);
    }
    Ok(())
}

fn collect_tree_ids(entry: &Entry, seen: &mut HashSet<NodeId>) {
    seen.extend(entry.id());
    for child in entry.children() {
        collect_tree_ids(child, seen);
    }
}

impl From<Vec<ChangeSet>> for ChangeList {
    fn from(change_sets: Vec<ChangeSet>) -> Self {
        let mut seen_ids = HashSet::new();
        for change_set in &change_sets {
            record_ids(&mut seen_ids, change_set);
        }
        ChangeList {
            change_sets,
            seen_ids,
        }
    }
}

impl<'a> IntoIterator for &'a ChangeList {
    type Item = &'a ChangeSet;
    type IntoIter = std::slice::Iter<'a, ChangeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Persistent for ChangeList {
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_count(self.change_sets.len())?;
        for change_set in &self.change_sets {
            out.write_change_set(change_set)?;
        }
        Ok(())
    }

    fn read_from(input: &mut StreamReader<'_>) -> Result<Self> {
        let count = input.read_count("change set count")?;
        let mut change_sets = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
        for _ in 0..count {
            change_sets.push(input.read_change_set()?);
        }
        Ok(ChangeList::from(change_sets))
    }
}
