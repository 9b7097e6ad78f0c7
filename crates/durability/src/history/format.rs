//! History file layout
//!
//! ```text
//! +------------------+
//! | magic "LVCS"     | 4 bytes
//! | format version   | u32
//! | history id       | 16 bytes (UUID)
//! | payload length   | u64
//! +------------------+
//! | payload          | root entry, then change list
//! +------------------+
//! | crc32            | u32, over header and payload
//! +------------------+
//! ```
//!
//! All integers are big-endian.

use byteorder::{BigEndian, ReadBytesExt};
use localvcs_core::{Error, Result};
use std::io::Cursor;
use uuid::Uuid;

/// File magic
pub const HISTORY_MAGIC: [u8; 4] = *b"LVCS";

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Footer (checksum) size in bytes
pub const FOOTER_SIZE: usize = 4;

/// Parsed history file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryHeader {
    /// Format version
    pub version: u32,
    /// Identity of this history, stable across saves
    pub history_id: Uuid,
    /// Payload length in bytes
    pub payload_len: u64,
}

impl HistoryHeader {
    /// Header for a payload written with the current format
    pub fn new(history_id: Uuid, payload_len: u64) -> Self {
        HistoryHeader {
            version: FORMAT_VERSION,
            history_id,
            payload_len,
        }
    }

    /// Serialize
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&HISTORY_MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..24].copy_from_slice(self.history_id.as_bytes());
        buf[24..32].copy_from_slice(&self.payload_len.to_be_bytes());
        buf
    }

    /// Parse and validate the header at the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 4];
        std::io::Read::read_exact(&mut cursor, &mut magic)
            .map_err(|e| Error::from_read(e, "history magic"))?;
        if magic != HISTORY_MAGIC {
            return Err(Error::Corruption(format!(
                "bad history magic {:02x?}",
                magic
            )));
        }

        let version = cursor
            .read_u32::<BigEndian>()
            .map_err(|e| Error::from_read(e, "history version"))?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let mut id = [0u8; 16];
        std::io::Read::read_exact(&mut cursor, &mut id)
            .map_err(|e| Error::from_read(e, "history id"))?;
        let payload_len = cursor
            .read_u64::<BigEndian>()
            .map_err(|e| Error::from_read(e, "payload length"))?;

        Ok(HistoryHeader {
            version,
            history_id: Uuid::from_bytes(id),
            payload_len,
        })
    }
}

/// Assemble a complete file image
pub fn encode_file(history_id: Uuid, payload: &[u8]) -> (Vec<u8>, u32) {
    let header = HistoryHeader::new(history_id, payload.len() as u64);
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(payload);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes);
    let crc = hasher.finalize();
    bytes.extend_from_slice(&crc.to_be_bytes());
    (bytes, crc)
}

/// Split a file image into header and payload, checking its framing
pub fn decode_file(bytes: &[u8], verify_checksum: bool) -> Result<(HistoryHeader, &[u8])> {
    let header = HistoryHeader::from_bytes(bytes)?;

    let expected = (HEADER_SIZE as u64)
        .checked_add(header.payload_len)
        .and_then(|n| n.checked_add(FOOTER_SIZE as u64))
        .ok_or_else(|| Error::Corruption("payload length overflows".into()))?;
    let actual = bytes.len() as u64;
    if actual < expected {
        return Err(Error::TruncatedInput {
            context: "history payload",
        });
    }
    if actual > expected {
        return Err(Error::Corruption(format!(
            "{} trailing bytes after history footer",
            actual - expected
        )));
    }

    let body_end = bytes.len() - FOOTER_SIZE;
    if verify_checksum {
        let stored = u32::from_be_bytes([
            bytes[body_end],
            bytes[body_end + 1],
            bytes[body_end + 2],
            bytes[body_end + 3],
        ]);
        let computed = crc32fast::hash(&bytes[..body_end]);
        if stored != computed {
            return Err(Error::Corruption(format!(
                "history checksum mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            )));
        }
    }

    Ok((header, &bytes[HEADER_SIZE..body_end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = HistoryHeader::new(Uuid::new_v4(), 1234);
        let parsed = HistoryHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_file_roundtrip() {
        let id = Uuid::new_v4();
        let (bytes, crc) = encode_file(id, b"payload");
        assert_eq!(bytes.len(), HEADER_SIZE + 7 + FOOTER_SIZE);
        assert_eq!(crc, crc32fast::hash(&bytes[..bytes.len() - FOOTER_SIZE]));

        let (header, payload) = decode_file(&bytes, true).unwrap();
        assert_eq!(header.history_id, id);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_bad_magic() {
        let (mut bytes, _) = encode_file(Uuid::new_v4(), b"x");
        bytes[0] = b'X';
        assert!(matches!(decode_file(&bytes, true), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_newer_version() {
        let (mut bytes, _) = encode_file(Uuid::new_v4(), b"x");
        bytes[4..8].copy_from_slice(&2u32.to_be_bytes());
        assert!(matches!(
            decode_file(&bytes, false),
            Err(Error::UnsupportedVersion {
                found: 2,
                supported: FORMAT_VERSION
            })
        ));
    }

    #[test]
    fn test_flipped_payload_bit() {
        let (mut bytes, _) = encode_file(Uuid::new_v4(), b"payload");
        bytes[HEADER_SIZE] ^= 0x01;
        assert!(matches!(decode_file(&bytes, true), Err(Error::Corruption(_))));
        assert!(decode_file(&bytes, false).is_ok());
    }

    #[test]
    fn test_every_short_file_is_truncated() {
        let (bytes, _) = encode_file(Uuid::new_v4(), b"payload");
        for len in 0..bytes.len() {
            let result = decode_file(&bytes[..len], true);
            assert!(
                result.as_ref().unwrap_err().is_truncated(),
                "len {}: {:?}",
                len,
                result
            );
        }
    }
}
