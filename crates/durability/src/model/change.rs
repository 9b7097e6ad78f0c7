//! Recorded mutations of the tree
//!
//! Every change names the node it affects by [`IdPath`], resolved against
//! the tree as it stands immediately before the change. For creations the
//! path's leaf is the id of the new node.
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `change.create-file` | path, name, content?, timestamp? |
//! | `change.create-directory` | path, name |
//! | `change.content` | path, content?, timestamp? |
//! | `change.rename` | path, new name |
//! | `change.move` | path, new parent path |
//! | `change.delete` | path |

use crate::registry::{decode_variant, DecodeFn, Polymorphic, RegistryError, TypeRegistry, Variant};
use crate::stream::{Persistent, StreamReader, StreamWriter};
use localvcs_core::{Content, Error, IdPath, NodeId, Result};
use once_cell::sync::Lazy;

use super::entry::Entry;

static CHANGE_REGISTRY: Lazy<std::result::Result<TypeRegistry<Change>, RegistryError>> =
    Lazy::new(|| {
        TypeRegistry::from_table(
            Change::FAMILY,
            &[
                (
                    CreateFile::TAG,
                    decode_variant::<Change, CreateFile> as DecodeFn<Change>,
                ),
                (
                    CreateDirectory::TAG,
                    decode_variant::<Change, CreateDirectory> as DecodeFn<Change>,
                ),
                (
                    ChangeFileContent::TAG,
                    decode_variant::<Change, ChangeFileContent> as DecodeFn<Change>,
                ),
                (
                    Rename::TAG,
                    decode_variant::<Change, Rename> as DecodeFn<Change>,
                ),
                (Move::TAG, decode_variant::<Change, Move> as DecodeFn<Change>),
                (
                    Delete::TAG,
                    decode_variant::<Change, Delete> as DecodeFn<Change>,
                ),
            ],
        )
    });

/// One recorded mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// New file
    CreateFile(CreateFile),
    /// New directory
    CreateDirectory(CreateDirectory),
    /// File body replaced
    ChangeFileContent(ChangeFileContent),
    /// Node renamed in place
    Rename(Rename),
    /// Node moved under another directory
    Move(Move),
    /// Node and its subtree removed
    Delete(Delete),
}

/// Create a file at `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFile {
    /// Path of the new file; the leaf is its id
    pub path: IdPath,
    /// File name
    pub name: String,
    /// Initial body
    pub content: Option<Content>,
    /// Modification time, epoch millis
    pub timestamp: Option<i64>,
}

/// Create an empty directory at `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirectory {
    /// Path of the new directory; the leaf is its id
    pub path: IdPath,
    /// Directory name
    pub name: String,
}

/// Replace a file's body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFileContent {
    /// File to update
    pub path: IdPath,
    /// New body
    pub new_content: Option<Content>,
    /// Modification time, epoch millis
    pub timestamp: Option<i64>,
}

/// Rename a node without moving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    /// Node to rename
    pub path: IdPath,
    /// New name
    pub new_name: String,
}

/// Move a node under another directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Node to move
    pub path: IdPath,
    /// Destination directory
    pub new_parent: IdPath,
}

/// Delete a node and its subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// Node to delete
    pub path: IdPath,
}

impl Change {
    /// Path of the node this change affects
    pub fn affected_path(&self) -> &IdPath {
        match self {
            Change::CreateFile(c) => &c.path,
            Change::CreateDirectory(c) => &c.path,
            Change::ChangeFileContent(c) => &c.path,
            Change::Rename(c) => &c.path,
            Change::Move(c) => &c.path,
            Change::Delete(c) => &c.path,
        }
    }

    /// Apply this change to the tree rooted at `root`.
    ///
    /// On error the tree is left unchanged.
    pub fn apply_to(&self, root: &mut Entry) -> Result<()> {
        match self {
            Change::CreateFile(c) => insert_new(
                root,
                &c.path,
                |id| Entry::file(id, c.name.clone(), c.content.clone()),
            ),
            Change::CreateDirectory(c) => {
                insert_new(root, &c.path, |id| Entry::directory(id, c.name.clone(), vec![]))
            }
            Change::ChangeFileContent(c) => match root.find_mut(&c.path) {
                Some(Entry::File(file)) => {
                    file.content = c.new_content.clone();
                    Ok(())
                }
                Some(_) => Err(Error::InvalidOperation(format!(
                    "{} is not a file",
                    c.path
                ))),
                None => Err(Error::EntryNotFound(c.path.clone())),
            },
            Change::Rename(c) => rename(root, &c.path, &c.new_name),
            Change::Move(c) => move_entry(root, &c.path, &c.new_parent),
            Change::Delete(c) => detach(root, &c.path).map(|_| ()),
        }
    }
}

fn leaf_id(path: &IdPath) -> Result<NodeId> {
    path.leaf()
        .ok_or_else(|| Error::InvalidOperation("the root cannot be changed".into()))
}

fn parent_path(path: &IdPath) -> Result<IdPath> {
    path.parent()
        .ok_or_else(|| Error::InvalidOperation("the root has no parent".into()))
}

/// Check that `dir` can take a child called `name` (ignoring `except`)
fn check_slot(dir: &Entry, dir_path: &IdPath, name: &str, except: Option<NodeId>) -> Result<()> {
    if !dir.is_directory_like() {
        return Err(Error::InvalidOperation(format!(
            "{} is not a directory",
            dir_path
        )));
    }
    match dir.find_child_by_name(name) {
        Some(existing) if except.is_none() || existing.id() != except => Err(
            Error::InvalidOperation(format!("{} already has a child named {:?}", dir_path, name)),
        ),
        _ => Ok(()),
    }
}

fn push_child(root: &mut Entry, dir_path: &IdPath, child: Entry) -> Result<()> {
    root.find_mut(dir_path)
        .and_then(Entry::children_mut)
        .ok_or_else(|| Error::EntryNotFound(dir_path.clone()))?
        .push(child);
    Ok(())
}

fn insert_new(root: &mut Entry, path: &IdPath, make: impl FnOnce(NodeId) -> Entry) -> Result<()> {
    let id = leaf_id(path)?;
    let dir_path = parent_path(path)?;
    if root.contains_id(id) {
        return Err(Error::InvalidOperation(format!("id {} is already in use", id)));
    }
    let entry = make(id);
    let dir = root
        .find(&dir_path)
        .ok_or_else(|| Error::EntryNotFound(dir_path.clone()))?;
    check_slot(dir, &dir_path, entry.name().unwrap_or_default(), None)?;
    push_child(root, &dir_path, entry)
}

fn rename(root: &mut Entry, path: &IdPath, new_name: &str) -> Result<()> {
    let id = leaf_id(path)?;
    let dir_path = parent_path(path)?;
    let dir = root
        .find(&dir_path)
        .ok_or_else(|| Error::EntryNotFound(path.clone()))?;
    if dir.child(id).is_none() {
        return Err(Error::EntryNotFound(path.clone()));
    }
    check_slot(dir, &dir_path, new_name, Some(id))?;

    match root.find_mut(path) {
        Some(Entry::Directory(d)) => d.name = new_name.to_string(),
        Some(Entry::File(f)) => f.name = new_name.to_string(),
        Some(Entry::Root(_)) => {
            return Err(Error::InvalidOperation(format!("{} is a root entry", path)))
        }
        None => return Err(Error::EntryNotFound(path.clone())),
    }
    Ok(())
}

fn move_entry(root: &mut Entry, path: &IdPath, new_parent: &IdPath) -> Result<()> {
    let id = leaf_id(path)?;
    if new_parent.starts_with(path) {
        return Err(Error::InvalidOperation(format!(
            "cannot move {} into its own subtree {}",
            path, new_parent
        )));
    }
    let name = root
        .find(path)
        .and_then(Entry::name)
        .ok_or_else(|| Error::EntryNotFound(path.clone()))?
        .to_string();
    let dir = root
        .find(new_parent)
        .ok_or_else(|| Error::EntryNotFound(new_parent.clone()))?;
    check_slot(dir, new_parent, &name, Some(id))?;

    let entry = detach(root, path)?;
    // new_parent does not start with path, so detaching left it in place.
    push_child(root, new_parent, entry)
}

fn detach(root: &mut Entry, path: &IdPath) -> Result<Entry> {
    let id = leaf_id(path)?;
    let dir_path = parent_path(path)?;
    let children = root
        .find_mut(&dir_path)
        .and_then(Entry::children_mut)
        .ok_or_else(|| Error::EntryNotFound(path.clone()))?;
    let pos = children
        .iter()
        .position(|c| c.id() == Some(id))
        .ok_or_else(|| Error::EntryNotFound(path.clone()))?;
    Ok(children.remove(pos))
}

macro_rules! impl_from_variant {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Change {
                fn from(c: $variant) -> Self {
                    Change::$variant(c)
                }
            }
        )+
    };
}

impl_from_variant!(
    CreateFile,
    CreateDirectory,
    ChangeFileContent,
    Rename,
    Move,
    Delete
);

impl Polymorphic for Change {
    const FAMILY: &'static str = "change";

    fn type_tag(&self) -> &'static str {
        match self {
            Change::CreateFile(_) => CreateFile::TAG,
            Change::CreateDirectory(_) => CreateDirectory::TAG,
            Change::ChangeFileContent(_) => ChangeFileContent::TAG,
            Change::Rename(_) => Rename::TAG,
            Change::Move(_) => Move::TAG,
            Change::Delete(_) => Delete::TAG,
        }
    }

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        match self {
            Change::CreateFile(c) => c.write_payload(out),
            Change::CreateDirectory(c) => c.write_payload(out),
            Change::ChangeFileContent(c) => c.write_payload(out),
            Change::Rename(c) => c.write_payload(out),
            Change::Move(c) => c.write_payload(out),
            Change::Delete(c) => c.write_payload(out),
        }
    }

    fn registry() -> Result<&'static TypeRegistry<Self>> {
        CHANGE_REGISTRY.as_ref().map_err(|e| e.clone().into())
    }
}

impl Persistent for Change {
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_change(self)
    }

    fn read_from(input: &mut StreamReader<'_>) -> Result<Self> {
        input.read_change()
    }
}

impl Variant for CreateFile {
    const TAG: &'static str = "change.create-file";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)?;
        out.write_string(&self.name)?;
        out.write_content(self.content.as_ref())?;
        out.write_long(self.timestamp)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(CreateFile {
            path: input.read_id_path()?,
            name: input.read_string()?,
            content: input.read_content()?,
            timestamp: input.read_long()?,
        })
    }
}

impl Variant for CreateDirectory {
    const TAG: &'static str = "change.create-directory";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)?;
        out.write_string(&self.name)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(CreateDirectory {
            path: input.read_id_path()?,
            name: input.read_string()?,
        })
    }
}

impl Variant for ChangeFileContent {
    const TAG: &'static str = "change.content";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)?;
        out.write_content(self.new_content.as_ref())?;
        out.write_long(self.timestamp)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(ChangeFileContent {
            path: input.read_id_path()?,
            new_content: input.read_content()?,
            timestamp: input.read_long()?,
        })
    }
}

impl Variant for Rename {
    const TAG: &'static str = "change.rename";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)?;
        out.write_string(&self.new_name)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(Rename {
            path: input.read_id_path()?,
            new_name: input.read_string()?,
        })
    }
}

impl Variant for Move {
    const TAG: &'static str = "change.move";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)?;
        out.write_id_path(&self.new_parent)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(Move {
            path: input.read_id_path()?,
            new_parent: input.read_id_path()?,
        })
    }
}

impl Variant for Delete {
    const TAG: &'static str = "change.delete";

    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(&self.path)
    }

    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self> {
        Ok(Delete {
            path: input.read_id_path()?,
        })
    }
}
