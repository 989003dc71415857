// src/select/filters.rs
//! Exclusion filters for the file selector
//!
//! Each filter is an independent predicate over a candidate file. A file is
//! dropped if any filter in the chain rejects it; the order of the chain only
//! decides which filter gets named in trace output.

use crate::error::{BuildPhase, Error, Result};
use glob::Pattern;
use std::path::{Component, Path, PathBuf};

/// Directories holding version-control metadata
pub const VCS_DIRECTORIES: &[&str] = &[".git", ".svn", ".hg", ".bzr", "_darcs", "CVS"];

/// Glob matching the Composer manifest and lock file names
pub const MANIFEST_DESCRIPTOR_PATTERN: &str = "composer.*";

/// Globs matching editor backup and swap files
pub const BACKUP_PATTERNS: &[&str] = &["*~", "*.back", "*.swp"];

/// Glob matching the PHPUnit runner binaries
pub const TEST_RUNNER_PATTERN: &str = "phpunit*";

/// Directory names holding test suites
pub const TEST_DIRECTORIES: &[&str] = &["Tests", "tests", "test"];

/// Prefix marking hidden files and directories
pub const HIDDEN_PREFIX: char = '.';

/// Directory names holding documentation
pub const DOC_DIRECTORIES: &[&str] = &["docs"];

/// A file found during the walk, relative to the selected directory
pub struct Candidate<'a> {
    relative: &'a Path,
    file_name: String,
    directories: Vec<String>,
}

impl<'a> Candidate<'a> {
    pub fn new(relative: &'a Path) -> Self {
        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let file_name = segments.pop().unwrap_or_default();

        Self {
            relative,
            file_name,
            directories: segments,
        }
    }

    /// Path relative to the selected directory
    pub fn relative(&self) -> &Path {
        self.relative
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Directory segments between the selected directory and the file
    pub fn directories(&self) -> &[String] {
        &self.directories
    }
}

/// A predicate excluding files from selection
pub trait SelectFilter: Send + Sync {
    /// Filter name for trace output
    fn name(&self) -> &str;

    /// True if the candidate must be left out
    fn rejects(&self, candidate: &Candidate<'_>) -> bool;
}

/// Ordered list of filters
pub struct FilterChain {
    filters: Vec<Box<dyn SelectFilter>>,
}

impl FilterChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The filters every selection applies
    pub fn standard() -> Result<Self> {
        let mut chain = Self::new();
        chain.add(Box::new(VcsMetadataFilter));
        chain.add(Box::new(FileNamePatternFilter::new("hidden", &[".*"])?));
        chain.add(Box::new(HiddenDirectoryFilter));
        chain.add(Box::new(FileNamePatternFilter::new(
            "manifest-descriptor",
            &[MANIFEST_DESCRIPTOR_PATTERN],
        )?));
        chain.add(Box::new(FileNamePatternFilter::new("backup", BACKUP_PATTERNS)?));
        chain.add(Box::new(FileNamePatternFilter::new(
            "test-runner",
            &[TEST_RUNNER_PATTERN],
        )?));
        chain.add(Box::new(DirectorySegmentFilter::new("test-directory", TEST_DIRECTORIES)));
        chain.add(Box::new(DirectorySegmentFilter::new("docs-directory", DOC_DIRECTORIES)));
        Ok(chain)
    }

    pub fn add(&mut self, filter: Box<dyn SelectFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Name of the first filter rejecting the candidate, if any
    pub fn rejected_by(&self, candidate: &Candidate<'_>) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.rejects(candidate))
            .map(|f| f.name())
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Filter Implementations
// =============================================================================

/// Rejects files inside version-control metadata directories
pub struct VcsMetadataFilter;

impl SelectFilter for VcsMetadataFilter {
    fn name(&self) -> &str {
        "vcs-metadata"
    }

    fn rejects(&self, candidate: &Candidate<'_>) -> bool {
        candidate
            .directories()
            .iter()
            .any(|d| VCS_DIRECTORIES.contains(&d.as_str()))
    }
}

/// Rejects files whose name matches any of a set of glob patterns
pub struct FileNamePatternFilter {
    name: String,
    patterns: Vec<Pattern>,
}

impl FileNamePatternFilter {
    pub fn new(name: &str, patterns: &[&str]) -> Result<Self> {
        let mut compiled = Vec::new();
        for pat in patterns {
            let pattern = Pattern::new(pat).map_err(|e| {
                Error::invalid_input(
                    BuildPhase::FileSelection,
                    format!("invalid glob pattern '{}': {}", pat, e),
                )
            })?;
            compiled.push(pattern);
        }
        Ok(Self {
            name: name.to_string(),
            patterns: compiled,
        })
    }
}

impl SelectFilter for FileNamePatternFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn rejects(&self, candidate: &Candidate<'_>) -> bool {
        self.patterns.iter().any(|p| p.matches(candidate.file_name()))
    }
}

/// Rejects files below a dot-prefixed directory
pub struct HiddenDirectoryFilter;

impl SelectFilter for HiddenDirectoryFilter {
    fn name(&self) -> &str {
        "hidden-directory"
    }

    fn rejects(&self, candidate: &Candidate<'_>) -> bool {
        candidate
            .directories()
            .iter()
            .any(|d| d.starts_with(HIDDEN_PREFIX))
    }
}

/// Rejects files below a directory segment with one of the given names
///
/// Only segments below the selected directory count, and names must match
/// exactly (case-sensitive).
pub struct DirectorySegmentFilter {
    name: String,
    segments: Vec<String>,
}

impl DirectorySegmentFilter {
    pub fn new(name: &str, segments: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SelectFilter for DirectorySegmentFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn rejects(&self, candidate: &Candidate<'_>) -> bool {
        candidate
            .directories()
            .iter()
            .any(|d| self.segments.iter().any(|s| s == d))
    }
}

/// Rejects files equal to or below any of a set of relative paths
pub struct ExcludeListFilter {
    excludes: Vec<PathBuf>,
}

impl ExcludeListFilter {
    /// `excludes` must already be relative to the selected directory
    pub fn new(excludes: Vec<PathBuf>) -> Self {
        Self { excludes }
    }

    pub fn excludes(&self) -> &[PathBuf] {
        &self.excludes
    }
}

impl SelectFilter for ExcludeListFilter {
    fn name(&self) -> &str {
        "exclude-list"
    }

    fn rejects(&self, candidate: &Candidate<'_>) -> bool {
        self.excludes
            .iter()
            .any(|e| candidate.relative().starts_with(e))
    }
}
