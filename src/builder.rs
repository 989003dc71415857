// src/builder.rs
//! Build orchestration
//!
//! Sequences one build: resolve the manifest, open the archive, add
//! sources, includes, dependencies and manifest files, rewrite the entry
//! point, commit, and report. Any failure aborts the build and leaves no
//! artifact at the output path.

use crate::config::BuildConfig;
use crate::error::{BuildPhase, Error, Result};
use crate::manifest::{ComposerManifest, ManifestSource};
use crate::path::{resolve_under, to_archive_relative};
use crate::phar::ArchiveWriter;
use crate::progress::{BuildReporter, LogReporter};
use crate::select::select;
use crate::stub::rewrite_stub;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub path: PathBuf,
    /// Artifact size in bytes
    pub size: u64,
    pub entries: usize,
    /// Entries stored compressed
    pub compressed: usize,
    pub elapsed: Duration,
}

impl BuildSummary {
    /// Lines handed to the reporter on success
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Built {}", self.path.display()),
            format!("Size: {}", format_size(self.size)),
            format!("Entries: {} ({} compressed)", self.entries, self.compressed),
            format!("Elapsed: {:.2}s", self.elapsed.as_secs_f64()),
        ]
    }
}

/// PHAR builder
pub struct Builder {
    config: BuildConfig,
    reporter: Arc<dyn BuildReporter>,
}

impl Builder {
    /// Create a builder reporting through `tracing`
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(LogReporter::new()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build from the Composer manifest named in the configuration
    pub fn build(&self) -> Result<BuildSummary> {
        let manifest =
            ComposerManifest::from_file(&self.config.manifest).map_err(|source| Error::Manifest {
                path: self.config.manifest.clone(),
                source,
            })?;
        self.build_with_source(&manifest)
    }

    /// Build from any manifest source
    pub fn build_with_source(&self, source: &dyn ManifestSource) -> Result<BuildSummary> {
        self.config.validate()?;
        let started = Instant::now();
        let root = source.manifest_dir().to_path_buf();

        self.reporter
            .on_title(&format!("Building {}", self.config.artifact_name));

        let resolution = source.resolve(self.config.keep_dev);
        debug!(
            "Resolved {} source dirs, {} source files, {} dev excludes",
            resolution.source_dirs.len(),
            resolution.source_files.len(),
            resolution.dev_excludes.len()
        );

        let output = self.config.output_path();
        info!(
            "Creating {} (compression: {})",
            output.display(),
            self.config.compression
        );
        let mut writer = ArchiveWriter::open(&output, &self.config.artifact_name)?
            .with_compression(self.config.compression)
            .with_timestamp(self.config.effective_timestamp())
            .with_reporter(self.reporter.clone());

        let entry_disk = self.config.resolved_entry_point(&root);
        let entry_archive = to_archive_relative(&entry_disk, &root);
        writer.set_bootstrap(&entry_archive)?;

        let vendor_dir = resolve_under(&root, &resolution.vendor_dir);

        self.reporter.on_section_start("sources");
        // The dependency directory is walked on its own with dev excludes applied
        let source_excludes = [vendor_dir.clone()];
        for dir in &resolution.source_dirs {
            self.add_directory(&mut writer, &root, &resolve_under(&root, dir), &source_excludes)?;
        }
        for file in &resolution.source_files {
            let disk = resolve_under(&root, file);
            writer.add_file(&disk, &to_archive_relative(&disk, &root))?;
        }

        let includes = self.config.resolved_include_dirs(&root);
        if !includes.is_empty() {
            self.reporter.on_section_start("included directories");
            for dir in &includes {
                self.add_directory(&mut writer, &root, dir, &[])?;
            }
        }

        if vendor_dir.is_dir() {
            self.reporter.on_section_start("dependencies");
            let excludes: Vec<PathBuf> = resolution
                .dev_excludes
                .iter()
                .map(|exclude| resolve_under(&root, exclude))
                .collect();
            self.add_directory(&mut writer, &root, &vendor_dir, &excludes)?;
        } else {
            warn!(
                "Dependency directory {} does not exist, skipping",
                vendor_dir.display()
            );
        }

        self.reporter.on_section_start("manifest files");
        for descriptor in &resolution.descriptor_files {
            let disk = resolve_under(&root, descriptor);
            writer.add_file(&disk, &to_archive_relative(&disk, &root))?;
        }

        let content = fs::read(&entry_disk)
            .map_err(|e| Error::ingestion(BuildPhase::Ingestion, &entry_disk, e))?;
        writer.add_file_with_content(&entry_disk, &entry_archive, rewrite_stub(&content))?;

        let info = writer.commit()?;

        let summary = BuildSummary {
            path: info.path,
            size: info.size,
            entries: info.entries,
            compressed: info.compressed,
            elapsed: started.elapsed(),
        };
        self.reporter.on_success(&summary.lines());

        Ok(summary)
    }

    fn add_directory(
        &self,
        writer: &mut ArchiveWriter,
        root: &Path,
        dir: &Path,
        excludes: &[PathBuf],
    ) -> Result<usize> {
        let files = select(dir, excludes)?;
        debug!("{} files from {}", files.len(), dir.display());
        for file in &files {
            writer.add_file(file, &to_archive_relative(file, root))?;
        }
        Ok(files.len())
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{} B", bytes)
    }
}
