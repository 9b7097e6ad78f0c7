//! IdPath encoding
//!
//! Format: `[len: u32][len × id: i32]`, big-endian, root-first.
//! The length is always explicit; no id value is a terminator.

use super::primitives::{read_count, write_count, MAX_PREALLOCATED_ITEMS};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use localvcs_core::{Error, IdPath, Result};
use std::io::{Read, Write};

/// Write a path, root first
pub fn write_id_path<W: Write + ?Sized>(out: &mut W, path: &IdPath) -> Result<()> {
    write_count(out, path.len())?;
    for id in path.ids() {
        out.write_i32::<BigEndian>(*id)?;
    }
    Ok(())
}

/// Read a path written by [`write_id_path`]
pub fn read_id_path<R: Read + ?Sized>(input: &mut R) -> Result<IdPath> {
    let len = read_count(input, "id path length")?;
    let mut ids = Vec::with_capacity(len.min(MAX_PREALLOCATED_ITEMS));
    for _ in 0..len {
        let id = input
            .read_i32::<BigEndian>()
            .map_err(|e| Error::from_read(e, "id path element"))?;
        ids.push(id);
    }
    Ok(IdPath::new(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn roundtrip(path: &IdPath) -> IdPath {
        let mut buf: Vec<u8> = Vec::new();
        write_id_path(&mut buf, path).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        let decoded = read_id_path(&mut cursor).unwrap();
        assert_eq!(cursor.position() as usize, buf.len());
        decoded
    }

    #[test]
    fn test_layout() {
        let mut buf: Vec<u8> = Vec::new();
        write_id_path(&mut buf, &IdPath::new(vec![1, -1])).unwrap();
        assert_eq!(
            buf,
            vec![0, 0, 0, 2, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_root_path_roundtrip() {
        assert_eq!(roundtrip(&IdPath::root()), IdPath::root());
    }

    #[test]
    fn test_single_element_roundtrip() {
        let path = IdPath::new(vec![42]);
        assert_eq!(roundtrip(&path), path);
    }

    #[test]
    fn test_zero_id_is_not_a_terminator() {
        let path = IdPath::new(vec![0, 0, 7]);
        assert_eq!(roundtrip(&path), path);
    }

    #[test]
    fn test_declared_length_exceeds_input() {
        let mut buf: Vec<u8> = Vec::new();
        write_id_path(&mut buf, &IdPath::new(vec![1, 2, 3])).unwrap();
        buf.truncate(buf.len() - 2);

        let result = read_id_path(&mut Cursor::new(buf.as_slice()));
        assert!(result.unwrap_err().is_truncated());
    }

    #[test]
    fn test_huge_declared_length_is_truncation() {
        let buf = [0xFFu8, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1];
        let result = read_id_path(&mut Cursor::new(&buf[..]));
        assert!(result.unwrap_err().is_truncated());
    }

    proptest! {
        #[test]
        fn prop_path_roundtrip(ids in proptest::collection::vec(any::<i32>(), 0..64)) {
            let path = IdPath::new(ids);
            prop_assert_eq!(roundtrip(&path), path);
        }
    }
}
