//! Tree entries
//!
//! The versioned tree has three node kinds: the synthetic [`RootEntry`],
//! [`DirectoryEntry`] and [`FileEntry`]. All three share one payload
//! layout so a reader can walk a tree without knowing which kinds exist:
//!
//! ```text
//! [id: nullable i32][name: nullable string][content: nullable ref]
//! [child count: u32][children, each tag-prefixed]
//! ```
//!
//! Each kind validates the shape on decode: the root has no id, name or
//! content; a directory has no content; a file has no children.

use crate::codec::MAX_PREALLOCATED_ITEMS;
use crate::registry::{decode_variant, DecodeFn, Polymorphic, RegistryError, TypeRegistry, Variant};
use crate::stream::{Persistent, StreamReader, StreamWriter};
use localvcs_core::{Content, Error, IdPath, NodeId, Result};
use once_cell::sync::Lazy;

static ENTRY_REGISTRY: Lazy<std::result::Result<TypeRegistry<Entry>, RegistryError>> =
    Lazy::new(|| {
        TypeRegistry::from_table(
            Entry::FAMILY,
            &[
                (
                    RootEntry::TAG,
                    decode_variant::<Entry, RootEntry> as DecodeFn<Entry>,
                ),
                (
                    DirectoryEntry::TAG,
                    decode_variant::<Entry, DirectoryEntry> as DecodeFn<Entry>,
                ),
                (
                    FileEntry::TAG,
                    decode_variant::<Entry, FileEntry> as DecodeFn<Entry>,
                ),
            ],
        )
    });

/// Node of the versioned tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Synthetic tree root
    Root(RootEntry),
    /// Directory
    Directory(DirectoryEntry),
    /// File
    File(FileEntry),
}

/// Synthetic root; addressed by the empty [`IdPath`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootEntry {
    /// Top-level entries
    pub children: Vec<Entry>,
}

/// Directory node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Node id
    pub id: NodeId,
    /// Name within the parent
    pub name: String,
    /// Child entries, in insertion order
    pub children: Vec<Entry>,
}

/// File node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Node id
    pub id: NodeId,
    /// Name within the parent
    pub name: String,
    /// File body, if one was recorded
    pub content: Option<Content>,
}

impl Entry {
    /// Root holding `children`
    pub fn root(children: Vec<Entry>) -> Self {
        Entry::Root(RootEntry { children })
    }

    /// Directory node
    pub fn directory(id: NodeId, name: impl Into<String>, children: Vec<Entry>) -> Self {
        Entry::Directory(DirectoryEntry {
            id,
            name: name.into(),
            children,
        })
    }

    /// File node
    pub fn file(id: NodeId, name: impl Into<String>, content: Option<Content>) -> Self {
        Entry::File(FileEntry {
            id,
            name: name.into(),
            content,
        })
    }

    /// Node id (`None` for the root)
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Entry::Root(_) => None,
            Entry::Directory(d) => Some(d.id),
            Entry::File(f) => Some(f.id),
        }
    }

    /// Node name (`None` for the root)
    pub fn name(&self) -> Option<&str> {
        match self {
            Entry::Root(_) => None,
            Entry::Directory(d) => Some(&d.name),
            Entry::File(f) => Some(&f.name),
        }
    }

    /// File content (`None` for directories, the root, and empty files)
    pub fn content(&self) -> Option<&Content> {
        match self {
            Entry::File(f) => f.content.as_ref(),
            _ => None,
        }
    }

    /// Children (always empty for files)
    pub fn children(&self) -> &[Entry] {
        match self {
            Entry::Root(r) => &r.children,
            Entry::Directory(d) => &d.children,
            Entry::File(_) => &[],
        }
    }

    /// Mutable children, or `None` for files
    pub fn children_mut(&mut self) -> Option<&mut Vec<Entry>> {
        match self {
            Entry::Root(r) => Some(&mut r.children),
            Entry::Directory(d) => Some(&mut d.children),
            Entry::File(_) => None,
        }
    }

    /// True for nodes that can hold children
    pub fn is_directory_like(&self) -> bool {
        !matches!(self, Entry::File(_))
    }

    /// Direct child with the given id
    pub fn child(&self, id: NodeId) -> Option<&Entry> {
        self.children().iter().find(|c| c.id() == Some(id))
    }

    /// Direct child with the given name
    pub fn find_child_by_name(&self, name: &str) -> Option<&Entry> {
        self.children().iter().find(|c| c.name() == Some(name))
    }

    /// Entry at `path`, relative to this entry
    pub fn find(&self, path: &IdPath) -> Option<&Entry> {
        let mut current = self;
        for id in path.ids() {
            current = current.child(*id)?;
        }
        Some(current)
    }

    /// Mutable entry at `path`, relative to this entry
    pub fn find_mut(&mut self, path: &IdPath) -> Option<&mut Entry> {
        let mut current = self;
        for id in path.ids() {
            current = current
                .children_mut()?
                .iter_mut()
                .find(|c| c.id() == Some(*id))?;
        }
        Some(current)
    }

    /// Translate a path of names into the matching IdPath
    pub fn id_path_for_names(&self, names: &[&str]) -> Option<IdPath> {
        let mut current = self;
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            current = current.find_child_by_name(name)?;
            ids.push(current.id()?);
        }
        Some(IdPath::new(ids))
    }

    /// True if this entry or any descendant has `id`
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.id() == Some(id) || self.children().iter().any(|c| c.contains_id(id))
    }

    /// Number of entries in this subtree, this one included
    pub fn entry_count(&self) -> usize {
        1 + self.children().iter().map(Entry::entry_count).sum::<usize>()
    }
}

impl Default for Entry {
    fn default() -> Self {
        Entry::Root(RootEntry::default())
    }
}

impl From<RootEntry> for Entry {
    fn from(e: RootEntry) -> Self {
        Entry::Root(e)
    }
}

impl From<DirectoryEntry> for Entry {
    fn from(e: DirectoryEntry) -> Self {
        Entry::Directory(e)
    }
}

impl From<FileEntry> for Entry {
    fn from(e: FileEntry) -> Self {
        Entry::File(e)
    }
}

impl Polymorphic for Entry {
    const FAMILY: &'static str = "entry";

    fn type_tag(&self) -> &'static str {
        match self {
            Entry::Root(_) => RootEntry::TAG,
            Entry::Directory(_) => DirectoryEntry::TAG,
            Entry::File(_) => FileEntry::TAG,
        }
    }

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        match self {
            Entry::Root(e) => e.write_payload(out),
            Entry::Directory(e) => e.write_payload(out),
            Entry::File(e) => e.write_payload(out),
        }
    }

    fn registry() -> Result<&'static TypeRegistry<Self>> {
        ENTRY_REGISTRY.as_ref().map_err(|e| e.clone().into())
    }
}

impl Persistent for Entry {
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_entry(self)
    }

    fn read_from(input: &mut StreamReader<'_>) -> Result<Self> {
        input.read_entry()
    }
}

/// Shared payload, read before the variant checks its shape
struct EntryFields {
    id: Option<NodeId>,
    name: Option<String>,
    content: Option<Content>,
    children: Vec<Entry>,
}

impl EntryFields {
    fn write(
        out: &mut StreamWriter<'_>,
        id: Option<NodeId>,
        name: Option<&str>,
        content: Option<&Content>,
        children: &[Entry],
    ) -> Result<()> {
        out.write_integer(id)?;
        out.write_nullable_string(name)?;
        out.write_content(content)?;
        out.write_count(children.len())?;
        for child in children {
            out.write_entry(child)?;
        }
        Ok(())
    }

    fn read(input: &mut StreamReader<'_>) -> Result<Self> {
        let id = input.read_integer()?;
        let name = input.read_nullable_string()?;
        let content = input.read_content()?;
        let count = input.read_count("entry child count")?;
        let mut children = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
        for _ in 0..count {
            let child = input.read_entry()?;
            if let Entry::Root(_) = child {
                return Err(Error::Corruption("root entry nested inside a tree".into()));
            }
            children.push(child);
        }
        Ok(EntryFields {
            id,
            name,
            content,
            children,
        })
    }

    fn require_id_and_name(id: Option<NodeId>, name: Option<String>, tag: &str) -> Result<(NodeId, String)> {
        match (id, name) {
            (Some(id), Some(name)) => Ok((id, name)),
            _ => Err(Error::Corruption(format!("{} without id or name", tag))),
        }
    }
}

impl Variant for RootEntry {
    const TAG: &'static str = "entry.root";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        EntryFields::write(out, None, None, None, &self.children)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        let fields = EntryFields::read(input)?;
        if fields.id.is_some() || fields.name.is_some() || fields.content.is_some() {
            return Err(Error::Corruption(format!(
                "{} with id, name or content",
                Self::TAG
            )));
        }
        Ok(RootEntry {
            children: fields.children,
        })
    }
}

impl Variant for DirectoryEntry {
    const TAG: &'static str = "entry.directory";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        EntryFields::write(out, Some(self.id), Some(&self.name), None, &self.children)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        let fields = EntryFields::read(input)?;
        if fields.content.is_some() {
            return Err(Error::Corruption(format!("{} with content", Self::TAG)));
        }
        let (id, name) = EntryFields::require_id_and_name(fields.id, fields.name, Self::TAG)?;
        Ok(DirectoryEntry {
            id,
            name,
            children: fields.children,
        })
    }
}

impl Variant for FileEntry {
    const TAG: &'static str = "entry.file";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        EntryFields::write(out, Some(self.id), Some(&self.name), self.content.as_ref(), &[])
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        let fields = EntryFields::read(input)?;
        if !fields.children.is_empty() {
            return Err(Error::Corruption(format!("{} with children", Self::TAG)));
        }
        let (id, name) = EntryFields::require_id_and_name(fields.id, fields.name, Self::TAG)?;
        Ok(FileEntry {
            id,
            name,
            content: fields.content,
        })
    }
}
