// src/manifest/composer.rs
//! Composer manifest reader
//!
//! Reads `composer.json` (and `composer.lock` when present) and maps the
//! autoload configuration onto the directories and files a build packages.

use super::{ManifestError, ManifestSource, SourcePaths, push_unique};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Manifest file name
pub const MANIFEST_FILE: &str = "composer.json";
/// Lock file name
pub const LOCK_FILE: &str = "composer.lock";
/// Dependency directory used when `config.vendor-dir` is not set
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

/// A string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    fn values(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// One autoload section (`autoload` or `autoload-dev`)
#[derive(Debug, Clone, Default, Deserialize)]
struct Autoload {
    #[serde(rename = "psr-4", default, deserialize_with = "namespace_map")]
    psr4: BTreeMap<String, OneOrMany>,

    #[serde(rename = "psr-0", default, deserialize_with = "namespace_map")]
    psr0: BTreeMap<String, OneOrMany>,

    #[serde(default)]
    classmap: Vec<String>,

    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComposerConfig {
    #[serde(rename = "vendor-dir")]
    vendor_dir: Option<String>,
}

/// The parts of `composer.json` a build reads
#[derive(Debug, Clone, Default, Deserialize)]
struct ComposerJson {
    name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    autoload: Autoload,

    #[serde(rename = "autoload-dev", default, deserialize_with = "lenient")]
    autoload_dev: Autoload,

    #[serde(default)]
    bin: OneOrMany,

    #[serde(rename = "require-dev", default, deserialize_with = "namespace_map")]
    require_dev: BTreeMap<String, Value>,

    #[serde(default, deserialize_with = "lenient")]
    config: ComposerConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct LockedPackage {
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComposerLock {
    #[serde(rename = "packages-dev", default)]
    packages_dev: Option<Vec<LockedPackage>>,
}

/// Composer encodes empty objects as `[]`; accept that for map-valued keys
fn namespace_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) if items.is_empty() => Ok(BTreeMap::new()),
        Value::Null => Ok(BTreeMap::new()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Same as `namespace_map` for struct-valued keys
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) if items.is_empty() => Ok(T::default()),
        Value::Null => Ok(T::default()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Platform requirements are not installed into the vendor directory
fn is_platform_package(name: &str) -> bool {
    !name.contains('/')
        || name == "php"
        || name.starts_with("ext-")
        || name.starts_with("lib-")
        || name.starts_with("composer-")
}

/// A parsed `composer.json` with its optional lock file
#[derive(Debug, Clone)]
pub struct ComposerManifest {
    manifest_path: PathBuf,
    manifest_dir: PathBuf,
    json: ComposerJson,
    lock: Option<ComposerLock>,
}

impl ComposerManifest {
    /// Load a manifest
    ///
    /// `path` may name the manifest file or the directory holding it. The
    /// manifest directory is canonicalized and becomes the working root.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&manifest_path)?;
        let manifest_path = fs::canonicalize(&manifest_path)?;
        let manifest_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ManifestError::Invalid("manifest has no parent directory".to_string()))?;

        let json = Self::parse(&content)?;

        let lock_path = manifest_dir.join(LOCK_FILE);
        let lock = if lock_path.is_file() {
            let lock_content = fs::read_to_string(&lock_path)?;
            Some(serde_json::from_str::<ComposerLock>(&lock_content)?)
        } else {
            warn!("No {} next to {}", LOCK_FILE, manifest_path.display());
            None
        };

        debug!("Loaded Composer manifest {}", manifest_path.display());

        Ok(Self {
            manifest_path,
            manifest_dir,
            json,
            lock,
        })
    }

    fn parse(content: &str) -> Result<ComposerJson, ManifestError> {
        let json: ComposerJson = serde_json::from_str(content)?;
        if let Some(name) = &json.name
            && name.trim().is_empty()
        {
            return Err(ManifestError::Invalid("package name is empty".to_string()));
        }
        Ok(json)
    }

    /// Path of the manifest file
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Package name, e.g. `acme/tool`
    pub fn package_name(&self) -> Option<&str> {
        self.json.name.as_deref()
    }

    pub fn has_lock(&self) -> bool {
        self.lock.is_some()
    }

    /// `<short package name>.phar`, falling back to the manifest directory name
    pub fn default_artifact_name(&self) -> String {
        let short = self
            .json
            .name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.manifest_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "app".to_string());
        format!("{}.phar", short)
    }

    /// First declared binary
    pub fn default_entry_point(&self) -> Option<PathBuf> {
        self.json.bin.values().first().map(PathBuf::from)
    }

    fn autoload_paths(&self, autoload: &Autoload) -> SourcePaths {
        let mut paths = SourcePaths::default();

        for targets in autoload.psr4.values().chain(autoload.psr0.values()) {
            for target in targets.values() {
                push_unique(&mut paths.dirs, source_dir(target));
            }
        }

        for entry in &autoload.classmap {
            let path = source_dir(entry);
            if self.manifest_dir.join(&path).is_dir() {
                push_unique(&mut paths.dirs, path);
            } else {
                push_unique(&mut paths.files, path);
            }
        }

        for file in &autoload.files {
            push_unique(&mut paths.files, PathBuf::from(file));
        }

        paths
    }
}

/// Autoload target as a relative directory; `""` is the project root
fn source_dir(target: &str) -> PathBuf {
    let trimmed = target.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() || trimmed == "." {
        PathBuf::from(".")
    } else {
        PathBuf::from(trimmed)
    }
}

impl ManifestSource for ComposerManifest {
    fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    fn source_paths(&self, include_dev: bool) -> SourcePaths {
        let mut paths = self.autoload_paths(&self.json.autoload);
        if include_dev {
            paths.extend_unique(self.autoload_paths(&self.json.autoload_dev));
        }
        for bin in self.json.bin.values() {
            push_unique(&mut paths.files, PathBuf::from(bin));
        }
        paths
    }

    fn vendor_dir(&self) -> PathBuf {
        let dir = self
            .json
            .config
            .vendor_dir
            .as_deref()
            .map(|d| d.trim_end_matches(['/', '\\']))
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_VENDOR_DIR);
        PathBuf::from(dir)
    }

    fn dev_only_packages(&self) -> Vec<String> {
        let names: Vec<String> = match self.lock.as_ref().and_then(|l| l.packages_dev.as_ref()) {
            Some(packages) => packages.iter().map(|p| p.name.clone()).collect(),
            None => self.json.require_dev.keys().cloned().collect(),
        };

        names
            .into_iter()
            .filter(|name| !is_platform_package(name))
            .collect()
    }

    fn descriptor_files(&self) -> Vec<PathBuf> {
        let mut files = vec![PathBuf::from(MANIFEST_FILE)];
        if self.lock.is_some() {
            files.push(PathBuf::from(LOCK_FILE));
        }
        files
    }
}
