//! Primitive value encoding
//!
//! # Binary Format
//!
//! All integers are big-endian.
//!
//! ```text
//! string:           [len: u32][UTF-8 bytes]
//! count:            [n: u32]
//! nullable value:   [present: u8 (0 or 1)][value, only if present]
//! ```
//!
//! Absent is an ordinary outcome: `read_nullable_*` returns `None`, never
//! an error. A presence byte other than 0 or 1 is corruption.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use localvcs_core::{Error, Result};
use std::io::{Read, Write};

/// Largest allocation made up front for a declared element count.
///
/// Counts come from disk; a corrupt count must not trigger a huge
/// allocation before the truncation is noticed.
pub const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Write a presence flag
pub fn write_flag<W: Write + ?Sized>(out: &mut W, present: bool) -> Result<()> {
    out.write_u8(present as u8)?;
    Ok(())
}

/// Read a presence flag
pub fn read_flag<R: Read + ?Sized>(input: &mut R, context: &'static str) -> Result<bool> {
    let byte = input
        .read_u8()
        .map_err(|e| Error::from_read(e, context))?;
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::Corruption(format!(
            "invalid presence flag {:#04x} while reading {}",
            other, context
        ))),
    }
}

/// Write an element count
pub fn write_count<W: Write + ?Sized>(out: &mut W, count: usize) -> Result<()> {
    let count = u32::try_from(count).map_err(|_| {
        Error::InvalidOperation(format!("count {} exceeds u32::MAX", count))
    })?;
    out.write_u32::<BigEndian>(count)?;
    Ok(())
}

/// Read an element count
pub fn read_count<R: Read + ?Sized>(input: &mut R, context: &'static str) -> Result<usize> {
    let count = input
        .read_u32::<BigEndian>()
        .map_err(|e| Error::from_read(e, context))?;
    Ok(count as usize)
}

/// Write a length-prefixed UTF-8 string
pub fn write_string<W: Write + ?Sized>(out: &mut W, value: &str) -> Result<()> {
    write_count(out, value.len())?;
    out.write_all(value.as_bytes())?;
    Ok(())
}

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read + ?Sized>(input: &mut R, context: &'static str) -> Result<String> {
    let len = read_count(input, context)?;

    // Read through `take` so a corrupt length cannot force a huge buffer.
    let mut buf = Vec::with_capacity(len.min(4096));
    (&mut *input)
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Error::from_read(e, context))?;
    if buf.len() < len {
        return Err(Error::TruncatedInput { context });
    }

    String::from_utf8(buf)
        .map_err(|_| Error::Corruption(format!("invalid UTF-8 while reading {}", context)))
}

/// Write a string that may be absent
pub fn write_nullable_string<W: Write + ?Sized>(out: &mut W, value: Option<&str>) -> Result<()> {
    write_flag(out, value.is_some())?;
    if let Some(s) = value {
        write_string(out, s)?;
    }
    Ok(())
}

/// Read a string that may be absent
pub fn read_nullable_string<R: Read + ?Sized>(
    input: &mut R,
    context: &'static str,
) -> Result<Option<String>> {
    if !read_flag(input, context)? {
        return Ok(None);
    }
    read_string(input, context).map(Some)
}

/// Write a 32-bit integer that may be absent
pub fn write_nullable_i32<W: Write + ?Sized>(out: &mut W, value: Option<i32>) -> Result<()> {
    write_flag(out, value.is_some())?;
    if let Some(v) = value {
        out.write_i32::<BigEndian>(v)?;
    }
    Ok(())
}

/// Read a 32-bit integer that may be absent
pub fn read_nullable_i32<R: Read + ?Sized>(
    input: &mut R,
    context: &'static str,
) -> Result<Option<i32>> {
    if !read_flag(input, context)? {
        return Ok(None);
    }
    input
        .read_i32::<BigEndian>()
        .map(Some)
        .map_err(|e| Error::from_read(e, context))
}

/// Write a 64-bit integer that may be absent
pub fn write_nullable_i64<W: Write + ?Sized>(out: &mut W, value: Option<i64>) -> Result<()> {
    write_flag(out, value.is_some())?;
    if let Some(v) = value {
        out.write_i64::<BigEndian>(v)?;
    }
    Ok(())
}

/// Read a 64-bit integer that may be absent
pub fn read_nullable_i64<R: Read + ?Sized>(
    input: &mut R,
    context: &'static str,
) -> Result<Option<i64>> {
    if !read_flag(input, context)? {
        return Ok(None);
    }
    input
        .read_i64::<BigEndian>()
        .map(Some)
        .map_err(|e| Error::from_read(e, context))
}
