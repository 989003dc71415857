// src/commands.rs
//! Command implementations for the pharpack CLI

use anyhow::{Context, Result};
use pharpack::config::CONFIG_FILE;
use pharpack::manifest::{ComposerManifest, ManifestSource};
use pharpack::phar::PharArchive;
use pharpack::{BuildConfig, Builder, CompressionMode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Flags of `pharpack build`
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub manifest: Option<String>,
    pub output: Option<String>,
    pub name: Option<String>,
    pub entry: Option<String>,
    pub compression: Option<String>,
    pub include: Vec<String>,
    pub keep_dev: bool,
    pub config: Option<String>,
}

/// Fill the name and entry point from the manifest when not given
fn fill_defaults(config: &mut BuildConfig, manifest: &ComposerManifest) {
    if config.artifact_name.is_empty() {
        config.artifact_name = manifest.default_artifact_name();
        debug!("Using default artifact name {}", config.artifact_name);
    }
    if config.entry_point.as_os_str().is_empty()
        && let Some(entry) = manifest.default_entry_point()
    {
        debug!("Using first bin entry {} as entry point", entry.display());
        config.entry_point = entry;
    }
}

fn apply_flags(config: &mut BuildConfig, options: &BuildOptions) {
    if let Some(output) = &options.output {
        config.output_dir = PathBuf::from(output);
    }
    if let Some(name) = &options.name {
        config.artifact_name = name.clone();
    }
    if let Some(entry) = &options.entry {
        config.entry_point = PathBuf::from(entry);
    }
    if let Some(compression) = &options.compression {
        let mode = CompressionMode::from_name(compression);
        if mode == CompressionMode::None && compression != "none" {
            warn!("Unknown compression '{}', storing entries uncompressed", compression);
        }
        config.compression = mode;
    }
    config
        .include_dirs
        .extend(options.include.iter().map(PathBuf::from));
    if options.keep_dev {
        config.keep_dev = true;
    }
}

/// Load the config file (`--config`, else `./pharpack.toml` if present) and
/// apply the command-line flags on top
fn load_config(options: &BuildOptions) -> Result<BuildConfig> {
    let mut config = match &options.config {
        Some(path) => BuildConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config file {}", path))?,
        None if Path::new(CONFIG_FILE).is_file() => {
            debug!("Loading {} from the current directory", CONFIG_FILE);
            BuildConfig::from_file(Path::new(CONFIG_FILE))
                .with_context(|| format!("Failed to load config file {}", CONFIG_FILE))?
        }
        None => BuildConfig::default(),
    };

    if let Some(manifest) = &options.manifest {
        config.manifest = PathBuf::from(manifest);
    }
    apply_flags(&mut config, options);
    Ok(config)
}

/// Build a PHAR
pub fn cmd_build(options: BuildOptions) -> Result<()> {
    let mut config = load_config(&options)?;

    let manifest = ComposerManifest::from_file(&config.manifest)
        .with_context(|| format!("Failed to load manifest {}", config.manifest.display()))?;

    fill_defaults(&mut config, &manifest);

    info!(
        "Project root: {}, dependencies in {}",
        manifest.manifest_dir().display(),
        manifest.vendor_dir().display()
    );

    let summary = Builder::new(config)
        .build_with_source(&manifest)
        .context("Build failed")?;

    println!(
        "Built {} ({} entries, {} bytes)",
        summary.path.display(),
        summary.entries,
        summary.size
    );
    Ok(())
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    path: String,
    alias: &'a str,
    stub: String,
    size: u64,
    entries: &'a [pharpack::phar::EntryInfo],
    signature: &'a pharpack::phar::SignatureInfo,
}

/// Inspect a PHAR and verify its signature
pub fn cmd_inspect(artifact: &str, json: bool) -> Result<()> {
    let path = Path::new(artifact);

    if !path.exists() {
        anyhow::bail!("Artifact not found: {}", artifact);
    }

    let archive = PharArchive::open(path).context("Failed to read PHAR archive")?;

    if json {
        let output = InspectOutput {
            path: archive.path().display().to_string(),
            alias: archive.alias(),
            stub: archive.stub_str(),
            size: archive.total_size(),
            entries: archive.entries(),
            signature: archive.signature(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Archive: {}", archive.path().display());
    println!("Alias: {}", archive.alias());
    println!("Total size: {} bytes", archive.total_size());
    println!(
        "Signature: {} {} (verified)",
        archive.signature().algorithm,
        archive.signature().digest
    );

    println!();
    println!("Stub:");
    for line in archive.stub_str().lines() {
        println!("  {}", line);
    }

    println!();
    println!("Entries ({}):", archive.entries().len());
    for entry in archive.entries() {
        println!(
            "  {:o} {:>10} {:>10} {:<5} {}",
            entry.permissions, entry.size, entry.stored_size, entry.compression, entry.name
        );
    }

    Ok(())
}
