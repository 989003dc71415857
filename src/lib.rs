// src/lib.rs

//! pharpack
//!
//! Packages a PHP project and its Composer-installed dependencies into a
//! single executable PHAR archive.
//!
//! # Architecture
//!
//! - Manifest-driven: `composer.json` names the sources, the lock file names
//!   the dev-only packages to leave out
//! - Filter chain: every directory walk goes through the same exclusion filters
//! - Per-entry compression: entries are compressed as they are added
//! - Atomic commit: the artifact appears at its path complete or not at all

pub mod builder;
pub mod compression;
pub mod config;
mod error;
pub mod manifest;
pub mod path;
pub mod phar;
pub mod progress;
pub mod select;
pub mod stub;

pub use builder::{BuildSummary, Builder};
pub use compression::{Codec, CompressionMode};
pub use config::BuildConfig;
pub use error::{BuildPhase, Error, Result};
pub use manifest::{ComposerManifest, ManifestError, ManifestResolution, ManifestSource, SourcePaths};
pub use phar::{ArchiveWriter, PharArchive, WriterState};
pub use progress::{BuildEvent, BuildReporter, CallbackReporter, LogReporter, SilentReporter};
pub use select::select;
