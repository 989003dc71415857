// src/phar/format.rs
//! PHAR binary layout
//!
//! Constants and encoders for the manifest that follows the stub, and a
//! bounds-checked cursor used to decode it again. The layout is the one
//! `ext/phar` reads: little-endian integers, API version 1.1.1, one record
//! per entry, entry data in manifest order, then the signature trailer.

use crate::compression::Codec;
use std::fmt;

/// Manifest API version (1.1.1), stored as two raw bytes
pub const API_VERSION: [u8; 2] = [0x11, 0x10];

/// Global flag: archive carries a signature trailer
pub const FLAG_SIGNATURE: u32 = 0x0001_0000;
/// Global and entry flag: DEFLATE-compressed data
pub const FLAG_GZIP: u32 = 0x0000_1000;
/// Global and entry flag: bzip2-compressed data
pub const FLAG_BZIP2: u32 = 0x0000_2000;
/// Entry flag bits holding the Unix permissions
pub const PERMISSION_MASK: u32 = 0x0000_01FF;

/// Signature algorithm identifiers
pub const SIGNATURE_SHA256: u32 = 0x0003;
pub const SIGNATURE_SHA512: u32 = 0x0004;

/// Magic closing every signed archive
pub const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";

/// Marker the reader searches for to find the end of the stub
pub const HALT_TOKEN: &[u8] = b"__HALT_COMPILER();";

/// One manifest record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    pub uncompressed_size: u32,
    pub timestamp: u32,
    pub stored_size: u32,
    pub crc32: u32,
    pub flags: u32,
}

impl EntryHeader {
    /// Codec the entry's data is stored with
    pub fn codec(&self) -> Option<Codec> {
        if self.flags & FLAG_GZIP != 0 {
            Some(Codec::Gzip)
        } else if self.flags & FLAG_BZIP2 != 0 {
            Some(Codec::Bzip2)
        } else {
            None
        }
    }

    pub fn permissions(&self) -> u32 {
        self.flags & PERMISSION_MASK
    }
}

/// Entry flags for the given permissions and codec
pub fn entry_flags(permissions: u32, codec: Option<Codec>) -> u32 {
    let compression = match codec {
        Some(Codec::Gzip) => FLAG_GZIP,
        Some(Codec::Bzip2) => FLAG_BZIP2,
        None => 0,
    };
    (permissions & PERMISSION_MASK) | compression
}

/// Encode the manifest, including its leading length field
pub fn encode_manifest(alias: &str, entries: &[EntryHeader]) -> Vec<u8> {
    let mut global_flags = FLAG_SIGNATURE;
    for entry in entries {
        match entry.codec() {
            Some(Codec::Gzip) => global_flags |= FLAG_GZIP,
            Some(Codec::Bzip2) => global_flags |= FLAG_BZIP2,
            None => {}
        }
    }

    let mut body = Vec::new();
    put_u32(&mut body, entries.len() as u32);
    body.extend_from_slice(&API_VERSION);
    put_u32(&mut body, global_flags);
    put_bytes(&mut body, alias.as_bytes());
    // Archive metadata
    put_u32(&mut body, 0);

    for entry in entries {
        put_bytes(&mut body, entry.name.as_bytes());
        put_u32(&mut body, entry.uncompressed_size);
        put_u32(&mut body, entry.timestamp);
        put_u32(&mut body, entry.stored_size);
        put_u32(&mut body, entry.crc32);
        put_u32(&mut body, entry.flags);
        // Entry metadata
        put_u32(&mut body, 0);
    }

    let mut manifest = Vec::with_capacity(body.len() + 4);
    put_u32(&mut manifest, body.len() as u32);
    manifest.extend_from_slice(&body);
    manifest
}

/// Encode the signature trailer for a SHA-256 digest
pub fn encode_signature(digest: &[u8]) -> Vec<u8> {
    let mut trailer = Vec::with_capacity(digest.len() + 8);
    trailer.extend_from_slice(digest);
    put_u32(&mut trailer, SIGNATURE_SHA256);
    trailer.extend_from_slice(SIGNATURE_MAGIC);
    trailer
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

/// Decoding failure with the offset it happened at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub offset: usize,
    pub what: &'static str,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "truncated {} at offset {}", self.what, self.offset)
    }
}

/// Bounds-checked little-endian reader over a byte slice
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError {
                offset: self.pos,
                what,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Length-prefixed byte string
    pub fn bytes(&mut self, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, flags: u32) -> EntryHeader {
        EntryHeader {
            name: name.to_string(),
            uncompressed_size: 10,
            timestamp: 1_704_067_200,
            stored_size: 8,
            crc32: 0xdead_beef,
            flags,
        }
    }

    #[test]
    fn test_entry_flags() {
        assert_eq!(entry_flags(0o644, None), 0o644);
        assert_eq!(entry_flags(0o755, Some(Codec::Gzip)), 0o755 | FLAG_GZIP);
        assert_eq!(entry_flags(0o100644, Some(Codec::Bzip2)), 0o644 | FLAG_BZIP2);
    }

    #[test]
    fn test_header_codec() {
        assert_eq!(header("a", FLAG_GZIP | 0o644).codec(), Some(Codec::Gzip));
        assert_eq!(header("a", FLAG_BZIP2 | 0o644).codec(), Some(Codec::Bzip2));
        assert_eq!(header("a", 0o644).codec(), None);
        assert_eq!(header("a", FLAG_GZIP | 0o755).permissions(), 0o755);
    }

    #[test]
    fn test_manifest_layout() {
        let entries = vec![header("a.php", 0o644 | FLAG_GZIP)];
        let manifest = encode_manifest("app.phar", &entries);

        let mut cursor = Cursor::new(&manifest, 0);
        let len = cursor.u32("length").unwrap() as usize;
        assert_eq!(len, manifest.len() - 4);
        assert_eq!(cursor.u32("count").unwrap(), 1);
        assert_eq!(cursor.take(2, "api").unwrap(), &API_VERSION);
        assert_eq!(cursor.u32("flags").unwrap(), FLAG_SIGNATURE | FLAG_GZIP);
        assert_eq!(cursor.bytes("alias").unwrap(), b"app.phar");
        assert_eq!(cursor.u32("metadata").unwrap(), 0);
        assert_eq!(cursor.bytes("name").unwrap(), b"a.php");
        assert_eq!(cursor.u32("size").unwrap(), 10);
        assert_eq!(cursor.u32("timestamp").unwrap(), 1_704_067_200);
        assert_eq!(cursor.u32("stored").unwrap(), 8);
        assert_eq!(cursor.u32("crc").unwrap(), 0xdead_beef);
        assert_eq!(cursor.u32("flags").unwrap(), 0o644 | FLAG_GZIP);
        assert_eq!(cursor.u32("metadata").unwrap(), 0);
        assert_eq!(cursor.position(), manifest.len());
    }

    #[test]
    fn test_signature_trailer() {
        let trailer = encode_signature(&[0xab; 32]);
        assert_eq!(trailer.len(), 40);
        assert_eq!(&trailer[32..36], &SIGNATURE_SHA256.to_le_bytes());
        assert_eq!(&trailer[36..], SIGNATURE_MAGIC);
    }

    #[test]
    fn test_cursor_bounds() {
        let data = [1u8, 0, 0];
        let mut cursor = Cursor::new(&data, 0);
        let err = cursor.u32("count").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.to_string(), "truncated count at offset 0");
    }
}
