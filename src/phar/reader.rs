// src/phar/reader.rs
//! PHAR archive inspection
//!
//! Reads an archive produced by [`ArchiveWriter`](super::ArchiveWriter),
//! verifies its signature and gives access to the stub and entries.

use crate::compression;
use crate::error::{BuildPhase, Error, Result};
use crate::phar::format::{self, Cursor, DecodeError, EntryHeader};
use serde::Serialize;
use sha2::{Digest, Sha256, Sha512};
use std::fs;
use std::path::{Path, PathBuf};

/// Entry listed in an archive manifest
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub size: u32,
    pub stored_size: u32,
    pub timestamp: u32,
    pub crc32: u32,
    pub permissions: u32,
    /// Codec name, or `none`
    pub compression: &'static str,
    #[serde(skip)]
    header: EntryHeader,
    #[serde(skip)]
    offset: usize,
}

/// Verified signature of an archive
#[derive(Debug, Clone, Serialize)]
pub struct SignatureInfo {
    pub algorithm: &'static str,
    /// Hex-encoded digest
    pub digest: String,
}

/// A parsed PHAR archive
#[derive(Debug)]
pub struct PharArchive {
    path: PathBuf,
    bytes: Vec<u8>,
    stub_len: usize,
    alias: String,
    global_flags: u32,
    entries: Vec<EntryInfo>,
    signature: SignatureInfo,
}

impl PharArchive {
    /// Load and verify an archive
    pub fn open(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).map_err(|e| Error::ingestion(BuildPhase::Inspection, path, e))?;
        Self::from_bytes(path, bytes)
    }

    /// Parse an archive held in memory; `path` is used for error messages
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedArchive {
            path: path.to_path_buf(),
            reason,
        };
        let decode = |e: DecodeError| malformed(e.to_string());

        let stub_len = find_stub_end(&bytes)
            .ok_or_else(|| malformed("no __HALT_COMPILER(); marker found".to_string()))?;

        let (signature, signed_len) = verify_signature(&bytes, stub_len).map_err(malformed)?;

        let mut cursor = Cursor::new(&bytes[..signed_len], stub_len);
        let manifest_len = cursor.u32("manifest length").map_err(decode)? as usize;
        let manifest_end = cursor
            .position()
            .checked_add(manifest_len)
            .filter(|end| *end <= signed_len)
            .ok_or_else(|| malformed("manifest length exceeds archive size".to_string()))?;

        let entry_count = cursor.u32("entry count").map_err(decode)?;
        let api = cursor.take(2, "api version").map_err(decode)?;
        if api[0] != format::API_VERSION[0] {
            return Err(malformed(format!(
                "unsupported manifest api version {:02x}{:02x}",
                api[0], api[1]
            )));
        }
        let global_flags = cursor.u32("global flags").map_err(decode)?;
        let alias = String::from_utf8_lossy(cursor.bytes("alias").map_err(decode)?).into_owned();
        cursor.bytes("archive metadata").map_err(decode)?;

        let mut headers = Vec::new();
        for _ in 0..entry_count {
            let name = String::from_utf8_lossy(cursor.bytes("entry name").map_err(decode)?)
                .into_owned();
            let uncompressed_size = cursor.u32("entry size").map_err(decode)?;
            let timestamp = cursor.u32("entry timestamp").map_err(decode)?;
            let stored_size = cursor.u32("entry stored size").map_err(decode)?;
            let crc32 = cursor.u32("entry crc32").map_err(decode)?;
            let flags = cursor.u32("entry flags").map_err(decode)?;
            cursor.bytes("entry metadata").map_err(decode)?;

            headers.push(EntryHeader {
                name,
                uncompressed_size,
                timestamp,
                stored_size,
                crc32,
                flags,
            });
        }

        if cursor.position() != manifest_end {
            return Err(malformed(format!(
                "manifest ends at {} but its length field says {}",
                cursor.position(),
                manifest_end
            )));
        }

        let mut offset = manifest_end;
        let mut entries = Vec::with_capacity(headers.len());
        for header in headers {
            let end = offset + header.stored_size as usize;
            if end > signed_len {
                return Err(malformed(format!(
                    "entry {} data runs past the end of the archive",
                    header.name
                )));
            }
            entries.push(EntryInfo {
                name: header.name.clone(),
                size: header.uncompressed_size,
                stored_size: header.stored_size,
                timestamp: header.timestamp,
                crc32: header.crc32,
                permissions: header.permissions(),
                compression: header.codec().map(|c| c.name()).unwrap_or("none"),
                header,
                offset,
            });
            offset = end;
        }

        if offset != signed_len {
            return Err(malformed(format!(
                "{} trailing bytes before the signature",
                signed_len - offset
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            stub_len,
            alias,
            global_flags,
            entries,
            signature,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn global_flags(&self) -> u32 {
        self.global_flags
    }

    /// Stub bytes, up to and including the stub terminator
    pub fn stub(&self) -> &[u8] {
        &self.bytes[..self.stub_len]
    }

    pub fn stub_str(&self) -> String {
        String::from_utf8_lossy(self.stub()).into_owned()
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn signature(&self) -> &SignatureInfo {
        &self.signature
    }

    /// Total uncompressed size of all entries
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size as u64).sum()
    }

    /// Read an entry's uncompressed content, checking its CRC32
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::MalformedArchive {
                path: self.path.clone(),
                reason: format!("no entry named {}", name),
            })?;

        let stored = &self.bytes[entry.offset..entry.offset + entry.stored_size as usize];
        let content = match entry.header.codec() {
            Some(codec) => compression::decompress(codec, stored).map_err(|e| {
                Error::ingestion(BuildPhase::Inspection, self.path.join(name), e)
            })?,
            None => stored.to_vec(),
        };

        if content.len() != entry.size as usize || crc32fast::hash(&content) != entry.crc32 {
            return Err(Error::MalformedArchive {
                path: self.path.clone(),
                reason: format!("checksum mismatch for entry {}", name),
            });
        }

        Ok(content)
    }
}

/// Offset just past the stub terminator
fn find_stub_end(bytes: &[u8]) -> Option<usize> {
    let start = bytes
        .windows(format::HALT_TOKEN.len())
        .position(|w| w == format::HALT_TOKEN)?;
    let mut pos = start + format::HALT_TOKEN.len();

    if bytes[pos..].starts_with(b" ?>") {
        pos += 3;
    }
    if bytes[pos..].starts_with(b"\r\n") {
        pos += 2;
    } else if bytes[pos..].starts_with(b"\n") {
        pos += 1;
    }
    Some(pos)
}

/// Check the signature trailer; returns it with the length of the signed data
fn verify_signature(bytes: &[u8], stub_len: usize) -> std::result::Result<(SignatureInfo, usize), String> {
    if bytes.len() < stub_len + 8 || &bytes[bytes.len() - 4..] != format::SIGNATURE_MAGIC {
        return Err("missing GBMB signature trailer".to_string());
    }

    let flags_at = bytes.len() - 8;
    let flags = u32::from_le_bytes([
        bytes[flags_at],
        bytes[flags_at + 1],
        bytes[flags_at + 2],
        bytes[flags_at + 3],
    ]);

    let (algorithm, digest_len) = match flags {
        format::SIGNATURE_SHA256 => ("SHA-256", 32),
        format::SIGNATURE_SHA512 => ("SHA-512", 64),
        other => return Err(format!("unsupported signature type {:#06x}", other)),
    };

    let signed_len = flags_at
        .checked_sub(digest_len)
        .filter(|len| *len >= stub_len)
        .ok_or_else(|| "signature trailer overlaps the stub".to_string())?;
    let stored = &bytes[signed_len..flags_at];

    let computed = match flags {
        format::SIGNATURE_SHA256 => Sha256::digest(&bytes[..signed_len]).to_vec(),
        _ => Sha512::digest(&bytes[..signed_len]).to_vec(),
    };

    if computed != stored {
        return Err(format!("{} signature mismatch", algorithm));
    }

    Ok((
        SignatureInfo {
            algorithm,
            digest: hex::encode(stored),
        },
        signed_len,
    ))
}
