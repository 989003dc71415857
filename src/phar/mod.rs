// src/phar/mod.rs
//! PHAR archive format
//!
//! This module implements the PHP archive format used for the build
//! artifact:
//! - Binary manifest layout and signature trailer
//! - Archive writer (buffering, per-entry compression, atomic commit)
//! - Archive reader (inspection and verification)

pub mod format;
pub mod reader;
pub mod writer;

pub use reader::{EntryInfo, PharArchive, SignatureInfo};
pub use writer::{ArchiveEntry, ArchiveWriter, CommitInfo, WriterState};
