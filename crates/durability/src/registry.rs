//! Type registry and polymorphic dispatch
//!
//! Entries and changes are open families: each variant picks a stable
//! string tag and owns its payload layout. A [`TypeRegistry`] maps every
//! tag of one family to the function that decodes its payload.
//!
//! ## Wire shape
//!
//! ```text
//! [tag: string][variant payload]
//! ```
//!
//! ## Rules
//!
//! 1. Tags are never reused for an incompatible layout
//! 2. Registries are built once per process from an explicit table and
//!    rejected if a tag appears twice
//! 3. An unknown tag is an error, never skipped: skipping would leave the
//!    stream positioned inside an unknown payload

use crate::stream::{StreamReader, StreamWriter};
use localvcs_core::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Decoder for one variant's payload (the tag has already been consumed)
pub type DecodeFn<T> = fn(&mut StreamReader<'_>) -> Result<T>;

/// Registry construction error.
///
/// Kept separate from [`Error`] so a failed registry can be cached in a
/// static and reported again on every use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate {family} type tag: {tag:?}")]
pub struct RegistryError {
    /// Polymorphic family
    pub family: &'static str,
    /// The conflicting tag
    pub tag: &'static str,
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::DuplicateTag {
            family: e.family,
            tag: e.tag.to_string(),
        }
    }
}

/// A variant of a polymorphic family.
///
/// Implementors own their payload layout; the tag is written by the
/// family encoder, never by the variant.
pub trait Variant: Sized {
    /// Stable type tag
    const TAG: &'static str;

    /// Write the payload fields in their fixed order
    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()>;

    /// Read the payload fields in the same order
    fn read_payload(input: &mut StreamReader<'_>) -> Result<Self>;
}

/// A polymorphic family (the enum over its variants)
pub trait Polymorphic: Sized + 'static {
    /// Family name used in errors and logs
    const FAMILY: &'static str;

    /// Tag of this value's variant
    fn type_tag(&self) -> &'static str;

    /// Write this value's payload (without the tag)
    fn write_payload(&self, out: &mut StreamWriter<'_>) -> Result<()>;

    /// The process-wide registry for this family
    fn registry() -> Result<&'static TypeRegistry<Self>>;
}

/// Tag → decoder table for one family
pub struct TypeRegistry<T: 'static> {
    family: &'static str,
    decoders: HashMap<&'static str, DecodeFn<T>>,
}

impl<T: 'static> TypeRegistry<T> {
    /// Create an empty registry
    pub fn new(family: &'static str) -> Self {
        TypeRegistry {
            family,
            decoders: HashMap::new(),
        }
    }

    /// Build a registry from a static table, rejecting duplicate tags
    pub fn from_table(
        family: &'static str,
        table: &[(&'static str, DecodeFn<T>)],
    ) -> std::result::Result<Self, RegistryError> {
        let mut registry = TypeRegistry::new(family);
        for &(tag, decode) in table {
            registry.register(tag, decode)?;
        }
        debug!(family, tags = registry.len(), "Type registry built");
        Ok(registry)
    }

    /// Register a decoder
    pub fn register(
        &mut self,
        tag: &'static str,
        decode: DecodeFn<T>,
    ) -> std::result::Result<(), RegistryError> {
        if self.decoders.contains_key(tag) {
            return Err(RegistryError {
                family: self.family,
                tag,
            });
        }
        self.decoders.insert(tag, decode);
        Ok(())
    }

    /// Family name
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// True if `tag` has a decoder
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// All registered tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.decoders.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Number of registered variants
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Read a tag and decode the matching variant
    pub fn decode(&self, input: &mut StreamReader<'_>) -> Result<T> {
        let tag = input.read_tag()?;
        self.decode_tagged(&tag, input)
    }

    /// Decode the payload of a variant whose tag was already read
    pub fn decode_tagged(&self, tag: &str, input: &mut StreamReader<'_>) -> Result<T> {
        let decode = self.decoders.get(tag).ok_or_else(|| Error::UnknownTag {
            family: self.family,
            tag: tag.to_string(),
        })?;
        decode(input)
    }
}

/// Write `value`'s tag followed by its payload
pub fn encode<T: Polymorphic>(value: &T, out: &mut StreamWriter<'_>) -> Result<()> {
    out.write_tag(value.type_tag())?;
    value.write_payload(out)
}

/// Read a tag and dispatch through `T`'s registry
pub fn decode<T: Polymorphic>(input: &mut StreamReader<'_>) -> Result<T> {
    T::registry()?.decode(input)
}

/// Decoder for variant `V` lifted into its family `T`.
///
/// Registry tables list `decode_variant::<T, V> as DecodeFn<T>` once per
/// variant.
pub fn decode_variant<T, V>(input: &mut StreamReader<'_>) -> Result<T>
where
    V: Variant + Into<T>,
{
    V::read_payload(input).map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use localvcs_core::MemoryContentStore;
    use std::io::Cursor;

    #[derive(Debug, PartialEq)]
    enum Shape {
        Dot,
        Line(i32),
    }

    fn decode_dot(_input: &mut StreamReader<'_>) -> Result<Shape> {
        Ok(Shape::Dot)
    }

    fn decode_line(input: &mut StreamReader<'_>) -> Result<Shape> {
        let len = input.read_integer()?.unwrap_or(0);
        Ok(Shape::Line(len))
    }

    fn shapes() -> TypeRegistry<Shape> {
        TypeRegistry::from_table(
            "shape",
            &[
                ("dot", decode_dot as DecodeFn<Shape>),
                ("line", decode_line as DecodeFn<Shape>),
            ],
        )
        .unwrap()
    }

    fn encoded(tag: &str, len: Option<i32>) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::new();
        let mut out = StreamWriter::new(&mut buf);
        out.write_tag(tag).unwrap();
        if tag == "line" {
            out.write_integer(len).unwrap();
        }
        buf
    }

    #[test]
    fn test_dispatch_by_tag() {
        let registry = shapes();
        let store = MemoryContentStore::new();

        let bytes = encoded("line", Some(7));
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut input = StreamReader::new(&mut cursor, &store);
        assert_eq!(registry.decode(&mut input).unwrap(), Shape::Line(7));

        let bytes = encoded("dot", None);
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut input = StreamReader::new(&mut cursor, &store);
        assert_eq!(registry.decode(&mut input).unwrap(), Shape::Dot);
    }

    #[test]
    fn test_unknown_tag_is_reported() {
        let registry = shapes();
        let store = MemoryContentStore::new();

        let bytes = encoded("circle", None);
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut input = StreamReader::new(&mut cursor, &store);
        match registry.decode(&mut input) {
            Err(Error::UnknownTag { family, tag }) => {
                assert_eq!(family, "shape");
                assert_eq!(tag, "circle");
            }
            other => panic!("Expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let result = TypeRegistry::from_table(
            "shape",
            &[
                ("dot", decode_dot as DecodeFn<Shape>),
                ("dot", decode_line as DecodeFn<Shape>),
            ],
        );
        let err = result.err().unwrap();
        assert_eq!(
            err,
            RegistryError {
                family: "shape",
                tag: "dot"
            }
        );

        let err: Error = err.into();
        assert!(matches!(err, Error::DuplicateTag { .. }));
    }

    #[test]
    fn test_register_after_construction() {
        let mut registry = TypeRegistry::new("shape");
        assert!(registry.is_empty());
        registry.register("dot", decode_dot as DecodeFn<Shape>).unwrap();
        assert!(registry
            .register("dot", decode_dot as DecodeFn<Shape>)
            .is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("dot"));
        assert!(!registry.contains("line"));
    }

    #[test]
    fn test_tags_sorted() {
        assert_eq!(shapes().tags(), vec!["dot", "line"]);
        assert_eq!(shapes().family(), "shape");
    }

    #[test]
    fn test_truncated_tag() {
        let registry = shapes();
        let store = MemoryContentStore::new();

        let mut bytes = encoded("line", Some(1));
        bytes.truncate(5);
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut input = StreamReader::new(&mut cursor, &store);
        assert!(registry.decode(&mut input).unwrap_err().is_truncated());
    }
}
