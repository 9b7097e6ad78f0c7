//! Stream façade
//!
//! [`StreamReader`] (decode mode) wraps an input source together with the
//! content store that resolves content references. [`StreamWriter`]
//! (encode mode) wraps an output sink only: content is written as a
//! reference, never as bytes.
//!
//! Every entity decoder receives the same `StreamReader` and pulls its
//! fields, nested paths and nested polymorphic values through it. No
//! decoder touches the byte source directly.
//!
//! A stream is borrowed mutably for the whole encode or decode call, so a
//! single stream cannot be shared between concurrent operations.
//!
//! Entry trees nest at most [`MAX_ENTRY_DEPTH`] levels (the root counts as
//! one). Deeper input is corruption on decode and refused on encode.

use crate::codec;
use crate::model::{Change, ChangeList, ChangeSet, Entry};
use crate::registry;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use localvcs_core::{Content, ContentId, ContentStore, Error, IdPath, Result};
use std::io::{Cursor, Read, Write};

/// Deepest entry nesting a stream reads or writes
pub const MAX_ENTRY_DEPTH: usize = 256;

/// Values with a fixed, self-contained wire layout.
pub trait Persistent: Sized {
    /// Write this value to `out`
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()>;

    /// Read a value written by [`Persistent::write_to`]
    fn read_from(input: &mut StreamReader<'_>) -> Result<Self>;
}

/// Decode-mode stream
pub struct StreamReader<'a> {
    input: &'a mut dyn Read,
    store: &'a dyn ContentStore,
    depth: usize,
}

impl<'a> StreamReader<'a> {
    /// Bind an input source and the store used to resolve content
    pub fn new(input: &'a mut dyn Read, store: &'a dyn ContentStore) -> Self {
        StreamReader {
            input,
            store,
            depth: 0,
        }
    }

    /// Store that resolves content references
    pub fn content_store(&self) -> &'a dyn ContentStore {
        self.store
    }

    /// Read a non-nullable string (type tags, names)
    pub fn read_string(&mut self) -> Result<String> {
        codec::read_string(&mut *self.input, "string")
    }

    /// Read a polymorphic type tag
    pub fn read_tag(&mut self) -> Result<String> {
        codec::read_string(&mut *self.input, "type tag")
    }

    /// Read a string that may be absent
    pub fn read_nullable_string(&mut self) -> Result<Option<String>> {
        codec::read_nullable_string(&mut *self.input, "nullable string")
    }

    /// Read a 32-bit integer that may be absent
    pub fn read_integer(&mut self) -> Result<Option<i32>> {
        codec::read_nullable_i32(&mut *self.input, "nullable integer")
    }

    /// Read a 64-bit integer that may be absent
    pub fn read_long(&mut self) -> Result<Option<i64>> {
        codec::read_nullable_i64(&mut *self.input, "nullable long")
    }

    /// Read an element count
    pub fn read_count(&mut self, context: &'static str) -> Result<usize> {
        codec::read_count(&mut *self.input, context)
    }

    /// Read an IdPath
    pub fn read_id_path(&mut self) -> Result<IdPath> {
        codec::read_id_path(&mut *self.input)
    }

    /// Read a content reference that may be absent, resolving its bytes
    pub fn read_content(&mut self) -> Result<Option<Content>> {
        if !codec::read_flag(&mut *self.input, "content flag")? {
            return Ok(None);
        }
        let raw = self
            .input
            .read_u64::<BigEndian>()
            .map_err(|e| Error::from_read(e, "content id"))?;
        Content::resolve(self.store, ContentId::from_raw(raw)).map(Some)
    }

    /// Read a tag-prefixed entry tree
    pub fn read_entry(&mut self) -> Result<Entry> {
        if self.depth >= MAX_ENTRY_DEPTH {
            return Err(Error::Corruption(format!(
                "entry tree nested deeper than {} levels",
                MAX_ENTRY_DEPTH
            )));
        }
        self.depth += 1;
        let entry = registry::decode(self);
        self.depth -= 1;
        entry
    }

    /// Read a tag-prefixed change
    pub fn read_change(&mut self) -> Result<Change> {
        registry::decode(self)
    }

    /// Read a change set
    pub fn read_change_set(&mut self) -> Result<ChangeSet> {
        ChangeSet::read_from(self)
    }

    /// Read a change list
    pub fn read_change_list(&mut self) -> Result<ChangeList> {
        ChangeList::read_from(self)
    }
}

/// Encode-mode stream
pub struct StreamWriter<'a> {
    output: &'a mut dyn Write,
    depth: usize,
}

impl<'a> StreamWriter<'a> {
    /// Bind an output sink
    pub fn new(output: &'a mut dyn Write) -> Self {
        StreamWriter { output, depth: 0 }
    }

    /// Write a non-nullable string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        codec::write_string(&mut *self.output, value)
    }

    /// Write a polymorphic type tag
    pub fn write_tag(&mut self, tag: &str) -> Result<()> {
        codec::write_string(&mut *self.output, tag)
    }

    /// Write a string that may be absent
    pub fn write_nullable_string(&mut self, value: Option<&str>) -> Result<()> {
        codec::write_nullable_string(&mut *self.output, value)
    }

    /// Write a 32-bit integer that may be absent
    pub fn write_integer(&mut self, value: Option<i32>) -> Result<()> {
        codec::write_nullable_i32(&mut *self.output, value)
    }

    /// Write a 64-bit integer that may be absent
    pub fn write_long(&mut self, value: Option<i64>) -> Result<()> {
        codec::write_nullable_i64(&mut *self.output, value)
    }

    /// Write an element count
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        codec::write_count(&mut *self.output, count)
    }

    /// Write an IdPath
    pub fn write_id_path(&mut self, path: &IdPath) -> Result<()> {
        codec::write_id_path(&mut *self.output, path)
    }

    /// Write a content reference that may be absent
    pub fn write_content(&mut self, content: Option<&Content>) -> Result<()> {
        codec::write_flag(&mut *self.output, content.is_some())?;
        if let Some(content) = content {
            self.output.write_u64::<BigEndian>(content.id().as_u64())?;
        }
        Ok(())
    }

    /// Write a tag-prefixed entry tree
    pub fn write_entry(&mut self, entry: &Entry) -> Result<()> {
        if self.depth >= MAX_ENTRY_DEPTH {
            return Err(Error::InvalidOperation(format!(
                "entry tree nested deeper than {} levels",
                MAX_ENTRY_DEPTH
            )));
        }
        self.depth += 1;
        let written = registry::encode(entry, self);
        self.depth -= 1;
        written
    }

    /// Write a tag-prefixed change
    pub fn write_change(&mut self, change: &Change) -> Result<()> {
        registry::encode(change, self)
    }

    /// Write a change set
    pub fn write_change_set(&mut self, change_set: &ChangeSet) -> Result<()> {
        change_set.write_to(self)
    }

    /// Write a change list
    pub fn write_change_list(&mut self, change_list: &ChangeList) -> Result<()> {
        change_list.write_to(self)
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}

/// Encode `value` into a fresh buffer
pub fn to_bytes<T: Persistent>(value: &T) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut out = StreamWriter::new(&mut buf);
        value.write_to(&mut out)?;
    }
    Ok(buf)
}

/// Decode a value that must occupy all of `bytes`
pub fn from_bytes<T: Persistent>(bytes: &[u8], store: &dyn ContentStore) -> Result<T> {
    let mut cursor = Cursor::new(bytes);
    let value = {
        let mut input = StreamReader::new(&mut cursor, store);
        T::read_from(&mut input)?
    };
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(Error::Corruption(format!(
            "{} trailing bytes after value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

impl Persistent for IdPath {
    fn write_to(&self, out: &mut StreamWriter<'_>) -> Result<()> {
        out.write_id_path(self)
    }

    fn read_from(input: &mut StreamReader<'_>) -> Result<Self> {
        input.read_id_path()
    }
}
