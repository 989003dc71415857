// src/compression/mod.rs
//! Per-entry compression for PHAR archives
//!
//! Provides the compression mode selected for a build, the policy deciding
//! which entries get compressed, and the two codecs PHAR entries support
//! (gzip, stored as raw DEFLATE, and bzip2).
//!
//! Entries are compressed one at a time as they are added. Compressing the
//! whole archive in a single batch after all entries are in place is what
//! the PHP extension does with `Phar::compressFiles()`, and that path keeps a
//! temporary file open per entry; large vendor trees exhaust file
//! descriptors. Compressing per entry sidesteps that. The PHAR format itself
//! does not require it.

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::Path;

/// Extensions of text-based files worth compressing
///
/// Binary and already-compressed assets (images, archives, fonts) gain
/// nothing from another compression pass.
pub const COMPRESSIBLE_EXTENSIONS: &[&str] = &[
    "php", "txt", "md", "xml", "js", "css", "less", "scss", "json", "html", "rst", "svg",
];

/// Compression mode chosen for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Store every entry raw
    #[default]
    None,
    /// Compress eligible entries with DEFLATE
    Gzip,
    /// Compress eligible entries with bzip2
    Bzip2,
}

impl CompressionMode {
    /// Parse a mode name
    ///
    /// Only the exact lowercase names `gzip` and `bzip2` select a codec;
    /// anything else, including `GZIP` or `Bzip2`, means no compression.
    ///
    /// ```
    /// use pharpack::compression::CompressionMode;
    ///
    /// assert_eq!(CompressionMode::from_name("gzip"), CompressionMode::Gzip);
    /// assert_eq!(CompressionMode::from_name("bzip2"), CompressionMode::Bzip2);
    /// assert_eq!(CompressionMode::from_name("GZIP"), CompressionMode::None);
    /// assert_eq!(CompressionMode::from_name("lz4"), CompressionMode::None);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "gzip" => Self::Gzip,
            "bzip2" => Self::Bzip2,
            _ => Self::None,
        }
    }

    /// Get a human-readable name for this mode
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }

    /// Codec used for eligible entries, if any
    pub fn codec(&self) -> Option<Codec> {
        match self {
            Self::None => None,
            Self::Gzip => Some(Codec::Gzip),
            Self::Bzip2 => Some(Codec::Bzip2),
        }
    }
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Codec applied to a single stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
}

impl Codec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decide whether an entry should be compressed
///
/// Always false for [`CompressionMode::None`]. Otherwise true iff the
/// extension of `archive_path` is in [`COMPRESSIBLE_EXTENSIONS`]
/// (case-sensitive).
pub fn should_compress(mode: CompressionMode, archive_path: &str) -> bool {
    if mode == CompressionMode::None {
        return false;
    }

    Path::new(archive_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COMPRESSIBLE_EXTENSIONS.contains(&ext))
}

/// Compress a byte slice with the given codec
pub fn compress(codec: Codec, data: &[u8]) -> io::Result<Vec<u8>> {
    match codec {
        Codec::Gzip => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        Codec::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}

/// Decompress a byte slice stored with the given codec
pub fn decompress(codec: Codec, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    match codec {
        Codec::Gzip => {
            flate2::read::DeflateDecoder::new(data).read_to_end(&mut output)?;
        }
        Codec::Bzip2 => {
            bzip2::read::BzDecoder::new(data).read_to_end(&mut output)?;
        }
    }
    Ok(output)
}
