// src/config.rs
//! Build configuration
//!
//! A `BuildConfig` is everything one build needs. It can be loaded from a
//! `pharpack.toml` file and is then overridden by command-line flags; values
//! still missing after that are derived from the Composer manifest.

use crate::compression::CompressionMode;
use crate::error::{BuildPhase, Error, Result};
use crate::path::{resolve_under, trim_trailing_separators};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE: &str = "pharpack.toml";

/// Environment variable fixing entry timestamps for reproducible builds
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

fn default_manifest() -> PathBuf {
    PathBuf::from("composer.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Configuration of one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Path to `composer.json` (or the directory holding it)
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Directory the artifact is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Artifact file name, also used as the archive alias
    #[serde(default)]
    pub artifact_name: String,

    /// Entry-point script, relative to the manifest directory
    #[serde(default)]
    pub entry_point: PathBuf,

    #[serde(default)]
    pub compression: CompressionMode,

    /// Additional directories to package, relative to the manifest directory
    #[serde(default, rename = "include")]
    pub include_dirs: Vec<PathBuf>,

    /// Keep dev-only packages and `autoload-dev` paths
    #[serde(default)]
    pub keep_dev: bool,

    /// Fixed timestamp for every entry
    #[serde(default)]
    pub timestamp: Option<u32>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            output_dir: default_output_dir(),
            artifact_name: String::new(),
            entry_point: PathBuf::new(),
            compression: CompressionMode::None,
            include_dirs: Vec::new(),
            keep_dev: false,
            timestamp: None,
        }
    }
}

impl BuildConfig {
    /// Create a configuration with the required values
    pub fn new(
        manifest: impl Into<PathBuf>,
        artifact_name: impl Into<String>,
        entry_point: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            artifact_name: artifact_name.into(),
            entry_point: entry_point.into(),
            ..Self::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_compression(mut self, mode: CompressionMode) -> Self {
        self.compression = mode;
        self
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_keep_dev(mut self, keep: bool) -> Self {
        self.keep_dev = keep;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<u32>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse from a TOML string
    pub fn parse(content: &str) -> std::result::Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check the values a build cannot do without
    pub fn validate(&self) -> Result<()> {
        let name = self.artifact_name.as_str();
        if name.is_empty() {
            return Err(Error::invalid_input(
                BuildPhase::ArchiveCreation,
                "artifact name is empty",
            ));
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '"']) {
            return Err(Error::invalid_input(
                BuildPhase::ArchiveCreation,
                format!("artifact name '{}' must be a plain file name", name),
            ));
        }
        if self.entry_point.as_os_str().is_empty() {
            return Err(Error::invalid_input(
                BuildPhase::ManifestResolution,
                "no entry point given and the manifest declares no bin",
            ));
        }
        Ok(())
    }

    /// Path of the artifact: the output directory joined with the name
    pub fn output_path(&self) -> PathBuf {
        trim_trailing_separators(&self.output_dir).join(&self.artifact_name)
    }

    /// Entry point resolved against `working_root`
    pub fn resolved_entry_point(&self, working_root: &Path) -> PathBuf {
        resolve_under(working_root, &self.entry_point)
    }

    /// Extra include directories resolved against `working_root`
    pub fn resolved_include_dirs(&self, working_root: &Path) -> Vec<PathBuf> {
        self.include_dirs
            .iter()
            .map(|dir| resolve_under(working_root, dir))
            .collect()
    }

    /// Entry timestamp: the configured one, else `SOURCE_DATE_EPOCH`
    pub fn effective_timestamp(&self) -> Option<u32> {
        self.timestamp.or_else(source_date_epoch)
    }
}

/// Read `SOURCE_DATE_EPOCH`, ignoring unset or non-numeric values
pub fn source_date_epoch() -> Option<u32> {
    std::env::var(SOURCE_DATE_EPOCH)
        .ok()
        .and_then(|value| parse_epoch(&value))
}

fn parse_epoch(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_trims_separators() {
        let config = BuildConfig::new("composer.json", "app.phar", "bin/app").with_output_dir("build//");
        assert_eq!(config.output_path(), PathBuf::from("build/app.phar"));

        let config = config.with_output_dir("/");
        assert_eq!(config.output_path(), PathBuf::from("/app.phar"));
    }

    #[test]
    fn test_parse_toml() {
        let config = BuildConfig::parse(
            r#"
manifest = "project/composer.json"
output_dir = "dist"
artifact_name = "tool.phar"
entry_point = "bin/tool"
compression = "gzip"
include = ["resources", "templates"]
keep_dev = true
timestamp = 1700000000
"#,
        )
        .unwrap();

        assert_eq!(config.manifest, PathBuf::from("project/composer.json"));
        assert_eq!(config.output_path(), PathBuf::from("dist/tool.phar"));
        assert_eq!(config.compression, CompressionMode::Gzip);
        assert_eq!(config.include_dirs.len(), 2);
        assert!(config.keep_dev);
        assert_eq!(config.effective_timestamp(), Some(1_700_000_000));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config = BuildConfig::parse("").unwrap();
        assert_eq!(config, BuildConfig::default());
        assert_eq!(config.manifest, PathBuf::from("composer.json"));
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BuildConfig::parse("compresion = \"gzip\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validate() {
        let ok = BuildConfig::new("composer.json", "app.phar", "bin/app");
        assert!(ok.validate().is_ok());

        let no_name = BuildConfig::new("composer.json", "", "bin/app");
        assert!(no_name.validate().is_err());

        let nested = BuildConfig::new("composer.json", "out/app.phar", "bin/app");
        let err = nested.validate().unwrap_err();
        assert_eq!(err.phase(), BuildPhase::ArchiveCreation);

        let no_entry = BuildConfig::new("composer.json", "app.phar", "");
        let err = no_entry.validate().unwrap_err();
        assert_eq!(err.phase(), BuildPhase::ManifestResolution);
    }

    #[test]
    fn test_resolution_against_root() {
        let config = BuildConfig::new("composer.json", "app.phar", "bin/app")
            .with_include_dir("res")
            .with_include_dir("/opt/shared");
        let root = Path::new("/work/project");
        assert_eq!(
            config.resolved_entry_point(root),
            PathBuf::from("/work/project/bin/app")
        );
        assert_eq!(
            config.resolved_include_dirs(root),
            vec![PathBuf::from("/work/project/res"), PathBuf::from("/opt/shared")]
        );
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_epoch(" 42\n"), Some(42));
        assert_eq!(parse_epoch("yesterday"), None);
        assert_eq!(parse_epoch("-1"), None);
    }
}
