//! File content references and the content store seam
//!
//! History records never embed file bodies. They hold a [`ContentId`]
//! naming a blob in a content-addressable store; the bytes are looked up
//! through a [`ContentStore`] when a record is decoded.
//!
//! The store owns deduplication: storing the same bytes twice yields the
//! same id.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Content-addressed blob identifier (XXH3-64 of the bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(u64);

impl ContentId {
    /// Wrap a raw identifier read from disk
    pub const fn from_raw(raw: u64) -> Self {
        ContentId(raw)
    }

    /// Identifier for the given bytes
    pub fn of(bytes: &[u8]) -> Self {
        ContentId(xxh3_64(bytes))
    }

    /// Raw identifier as written to disk
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Reference to immutable file bytes.
///
/// A decoded `Content` carries the bytes its store resolved. If the store
/// no longer holds the blob the reference survives but the bytes are
/// absent (see [`Content::is_available`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    id: ContentId,
    bytes: Option<Arc<[u8]>>,
}

impl Content {
    /// Content whose bytes are known
    pub fn new(id: ContentId, bytes: Arc<[u8]>) -> Self {
        Content {
            id,
            bytes: Some(bytes),
        }
    }

    /// Reference whose bytes the store could not produce
    pub fn unavailable(id: ContentId) -> Self {
        Content { id, bytes: None }
    }

    /// Put `bytes` into `store` and return a reference to them
    pub fn store(store: &dyn ContentStore, bytes: &[u8]) -> Result<Self> {
        let id = store.store(bytes)?;
        Ok(Content::new(id, Arc::from(bytes)))
    }

    /// Resolve `id` through `store`
    pub fn resolve(store: &dyn ContentStore, id: ContentId) -> Result<Self> {
        Ok(Content {
            id,
            bytes: store.resolve(id)?,
        })
    }

    /// Blob identifier
    pub fn id(&self) -> ContentId {
        self.id
    }

    /// Resolved bytes, if the store had them
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// True when the bytes were resolved
    pub fn is_available(&self) -> bool {
        self.bytes.is_some()
    }
}

/// Content-addressable blob store.
///
/// Ids are a 64-bit non-cryptographic hash. A store that finds different
/// bytes already held under an id reports [`Error::Corruption`] instead
/// of keeping either blob silently.
///
/// Decoding only calls [`ContentStore::resolve`]; writes happen when new
/// content is produced, outside the serialization path.
///
/// # Thread Safety
///
/// Stores must be `Send + Sync`; concurrent readers are expected.
pub trait ContentStore: Send + Sync {
    /// Persist `bytes` and return their identifier
    fn store(&self, bytes: &[u8]) -> Result<ContentId>;

    /// Bytes for `id`, or `None` if the store does not hold them
    fn resolve(&self, id: ContentId) -> Result<Option<Arc<[u8]>>>;

    /// True if `id` is held by the store
    fn contains(&self, id: ContentId) -> Result<bool> {
        Ok(self.resolve(id)?.is_some())
    }
}

/// In-memory content store
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Arc<[u8]>>>,
}

impl MemoryContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// True if no blob has been stored
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Drop a blob; later decodes see the content as unavailable
    pub fn purge(&self, id: ContentId) -> bool {
        self.blobs.write().remove(&id).is_some()
    }
}

impl ContentStore for MemoryContentStore {
    fn store(&self, bytes: &[u8]) -> Result<ContentId> {
        let id = ContentId::of(bytes);
        let mut blobs = self.blobs.write();
        match blobs.get(&id) {
            Some(existing) if &existing[..] != bytes => Err(Error::Corruption(format!(
                "content id {} already holds different bytes",
                id
            ))),
            Some(_) => Ok(id),
            None => {
                blobs.insert(id, Arc::from(bytes));
                Ok(id)
            }
        }
    }

    fn resolve(&self, id: ContentId) -> Result<Option<Arc<[u8]>>> {
        Ok(self.blobs.read().get(&id).cloned())
    }

    fn contains(&self, id: ContentId) -> Result<bool> {
        Ok(self.blobs.read().contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that trait is object-safe
    fn _accepts_dyn_store(_store: &dyn ContentStore) {}

    #[test]
    fn test_store_and_resolve() {
        let store = MemoryContentStore::new();
        let id = store.store(b"hello").unwrap();

        let bytes = store.resolve(id).unwrap().unwrap();
        assert_eq!(&*bytes, b"hello");
        assert!(store.contains(id).unwrap());
    }

    #[test]
    fn test_store_deduplicates() {
        let store = MemoryContentStore::new();
        let a = store.store(b"same").unwrap();
        let b = store.store(b"same").unwrap();
        let c = store.store(b"other").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let store = MemoryContentStore::new();
        assert!(store.resolve(ContentId::from_raw(42)).unwrap().is_none());
        assert!(!store.contains(ContentId::from_raw(42)).unwrap());
    }

    #[test]
    fn test_content_store_helper() {
        let store = MemoryContentStore::new();
        let content = Content::store(&store, b"body").unwrap();

        assert!(content.is_available());
        assert_eq!(content.bytes(), Some(&b"body"[..]));
        assert_eq!(content.id(), ContentId::of(b"body"));
    }

    #[test]
    fn test_resolve_after_purge_is_unavailable() {
        let store = MemoryContentStore::new();
        let content = Content::store(&store, b"gone soon").unwrap();
        assert!(store.purge(content.id()));

        let resolved = Content::resolve(&store, content.id()).unwrap();
        assert!(!resolved.is_available());
        assert_eq!(resolved, Content::unavailable(content.id()));
    }

    #[test]
    fn test_empty_blob() {
        let store = MemoryContentStore::new();
        let content = Content::store(&store, b"").unwrap();
        let resolved = Content::resolve(&store, content.id()).unwrap();
        assert_eq!(resolved.bytes(), Some(&b""[..]));
    }

    #[test]
    fn test_colliding_bytes_are_rejected() {
        let store = MemoryContentStore::new();
        let id = ContentId::of(b"real");
        store.blobs.write().insert(id, Arc::from(&b"forged"[..]));

        assert!(matches!(store.store(b"real"), Err(Error::Corruption(_))));
        assert_eq!(store.resolve(id).unwrap().as_deref(), Some(&b"forged"[..]));
    }

    #[test]
    fn test_content_id_display_is_hex() {
        let id = ContentId::from_raw(0xab);
        assert_eq!(id.to_string(), "00000000000000ab");
        assert_eq!(id.as_u64(), 0xab);
    }
}
