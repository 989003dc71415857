// src/manifest/mod.rs
//! Dependency manifest resolution
//!
//! A `ManifestSource` describes where a project keeps its sources and its
//! installed dependencies. The build only talks to this trait; the Composer
//! reader in [`composer`] is the implementation used by the CLI.

pub mod composer;

pub use composer::ComposerManifest;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Sources declared by a manifest, relative to the manifest directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePaths {
    /// Directories to walk
    pub dirs: Vec<PathBuf>,
    /// Individual files
    pub files: Vec<PathBuf>,
}

impl SourcePaths {
    /// Append paths, skipping ones already present
    pub fn extend_unique(&mut self, other: SourcePaths) {
        for dir in other.dirs {
            push_unique(&mut self.dirs, dir);
        }
        for file in other.files {
            push_unique(&mut self.files, file);
        }
    }
}

pub(crate) fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

/// Everything a build needs to know about a project's layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestResolution {
    pub source_dirs: Vec<PathBuf>,
    pub source_files: Vec<PathBuf>,
    pub vendor_dir: PathBuf,
    /// Dev-only package directories to leave out of the vendor walk
    ///
    /// Empty when dev dependencies are kept.
    pub dev_excludes: Vec<PathBuf>,
    /// Manifest files forced into the archive
    pub descriptor_files: Vec<PathBuf>,
}

/// Source of a project's layout
///
/// Paths returned by the layout methods are relative to `manifest_dir()`
/// unless absolute.
pub trait ManifestSource {
    /// Directory holding the manifest; the working root of the build
    fn manifest_dir(&self) -> &Path;

    /// Source directories and files, including dev autoload paths when
    /// `include_dev` is set
    fn source_paths(&self, include_dev: bool) -> SourcePaths;

    /// Directory holding installed dependencies
    fn vendor_dir(&self) -> PathBuf;

    /// Names of packages only needed for development, e.g. `acme/test-kit`
    fn dev_only_packages(&self) -> Vec<String>;

    /// Manifest and lock files to add to the archive
    fn descriptor_files(&self) -> Vec<PathBuf>;

    /// Collect the full layout for one build
    fn resolve(&self, keep_dev: bool) -> ManifestResolution {
        let sources = self.source_paths(keep_dev);
        let vendor_dir = self.vendor_dir();

        let dev_excludes = if keep_dev {
            Vec::new()
        } else {
            self.dev_only_packages()
                .iter()
                .map(|package| vendor_dir.join(package))
                .collect()
        };

        ManifestResolution {
            source_dirs: sources.dirs,
            source_files: sources.files,
            vendor_dir,
            dev_excludes,
            descriptor_files: self.descriptor_files(),
        }
    }
}
