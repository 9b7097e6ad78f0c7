//! Node addresses in the versioned tree
//!
//! An [`IdPath`] is the root-first list of node identifiers leading to a
//! node. It is a plain value: changes name the nodes they touch with an
//! IdPath, never with a live reference into a tree.

use std::fmt;

/// Identifier of a single tree node.
///
/// Identifiers are never reused within one history, so a path stays
/// meaningful after the node it named has been deleted.
pub type NodeId = i32;

/// Root-first sequence of node identifiers.
///
/// The empty path addresses the synthetic root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IdPath(Vec<NodeId>);

impl IdPath {
    /// Create a path from root-first identifiers
    pub fn new(ids: Vec<NodeId>) -> Self {
        IdPath(ids)
    }

    /// The path of the synthetic root
    pub fn root() -> Self {
        IdPath(Vec::new())
    }

    /// Identifiers, root first
    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }

    /// Number of identifiers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only for the root path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifier of the addressed node (`None` for the root)
    pub fn leaf(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    /// Path of the parent node (`None` for the root)
    pub fn parent(&self) -> Option<IdPath> {
        if self.0.is_empty() {
            return None;
        }
        Some(IdPath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Path of a child of this node
    pub fn child(&self, id: NodeId) -> IdPath {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        IdPath(ids)
    }

    /// True if `prefix` addresses this node or one of its ancestors
    pub fn starts_with(&self, prefix: &IdPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<NodeId>> for IdPath {
    fn from(ids: Vec<NodeId>) -> Self {
        IdPath(ids)
    }
}

impl From<&[NodeId]> for IdPath {
    fn from(ids: &[NodeId]) -> Self {
        IdPath(ids.to_vec())
    }
}

impl fmt::Display for IdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for id in &self.0 {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_root_path() {
        let root = IdPath::root();
        assert!(root.is_empty());
        assert_eq!(root.leaf(), None);
        assert_eq!(root.parent(), None);
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn test_leaf_and_parent() {
        let path = IdPath::new(vec![1, 5, 9]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.leaf(), Some(9));
        assert_eq!(path.parent(), Some(IdPath::new(vec![1, 5])));
        assert_eq!(path.to_string(), "/1/5/9");
    }

    #[test]
    fn test_single_element_parent_is_root() {
        let path = IdPath::new(vec![7]);
        assert_eq!(path.parent(), Some(IdPath::root()));
    }

    #[test]
    fn test_child() {
        let path = IdPath::new(vec![1]).child(2).child(3);
        assert_eq!(path.ids(), &[1, 2, 3]);
    }

    #[test]
    fn test_starts_with() {
        let path = IdPath::new(vec![1, 2, 3]);
        assert!(path.starts_with(&IdPath::root()));
        assert!(path.starts_with(&IdPath::new(vec![1, 2])));
        assert!(path.starts_with(&path));
        assert!(!path.starts_with(&IdPath::new(vec![2])));
    }

    #[test]
    fn test_negative_and_zero_ids_are_ordinary() {
        let path = IdPath::new(vec![0, -1, i32::MIN]);
        assert_eq!(path.leaf(), Some(i32::MIN));
        assert_eq!(path.to_string(), "/0/-1/-2147483648");
    }

    proptest! {
        #[test]
        fn prop_child_then_parent(ids in proptest::collection::vec(any::<i32>(), 0..16), id in any::<i32>()) {
            let path = IdPath::new(ids);
            let child = path.child(id);
            prop_assert_eq!(child.leaf(), Some(id));
            prop_assert!(child.starts_with(&path));
            prop_assert_eq!(child.parent(), Some(path));
        }
    }
}
