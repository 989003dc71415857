// src/select/mod.rs
//! File selection
//!
//! Walks a directory and returns the files that belong in the archive,
//! dropping everything the filter chain rejects (VCS metadata, hidden files
//! and directories, manifests, backups, test runners, test and doc directories, and the
//! caller's exclude list).

pub mod filters;

pub use filters::{Candidate, ExcludeListFilter, FilterChain, SelectFilter};

use crate::error::{BuildPhase, Error, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Select the files of `directory` using the standard filters
///
/// `exclude_list` entries may be absolute or relative to `directory`.
/// Returned paths are `directory` (as given) joined with each file's
/// directory-relative path, sorted.
pub fn select(directory: &Path, exclude_list: &[PathBuf]) -> Result<Vec<PathBuf>> {
    FileSelector::new()?.select(directory, exclude_list)
}

/// Directory walker applying a filter chain
pub struct FileSelector {
    chain: FilterChain,
}

impl FileSelector {
    /// Create a selector with the standard filter chain
    pub fn new() -> Result<Self> {
        Ok(Self {
            chain: FilterChain::standard()?,
        })
    }

    /// Create a selector with a custom chain
    pub fn with_chain(chain: FilterChain) -> Self {
        Self { chain }
    }

    /// Append a filter to the chain
    pub fn with_filter(mut self, filter: Box<dyn SelectFilter>) -> Self {
        self.chain.add(filter);
        self
    }

    /// Walk `directory` and return the surviving files
    pub fn select(&self, directory: &Path, exclude_list: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let resolved = resolve_directory(directory)?;
        let excludes = ExcludeListFilter::new(normalize_excludes(&resolved, exclude_list));

        let mut selected = Vec::new();
        let mut rejected = 0usize;

        for entry in WalkDir::new(&resolved).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| resolved.clone());
                    if is_dangling_link(&e) {
                        warn!("Skipping dangling symlink {}", path.display());
                        continue;
                    }
                    return Err(Error::ingestion(BuildPhase::FileSelection, path, io::Error::from(e)));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&resolved) else {
                continue;
            };

            let candidate = Candidate::new(relative);
            let verdict = self
                .chain
                .rejected_by(&candidate)
                .or_else(|| excludes.rejects(&candidate).then(|| excludes.name()));

            match verdict {
                Some(filter) => {
                    trace!("Excluded {} ({})", relative.display(), filter);
                    rejected += 1;
                }
                None => selected.push(relative.to_path_buf()),
            }
        }

        selected.sort();
        debug!(
            "Selected {} files from {} ({} excluded)",
            selected.len(),
            directory.display(),
            rejected
        );

        Ok(selected
            .into_iter()
            .map(|relative| directory.join(relative))
            .collect())
    }
}


/// Canonicalize a directory argument, failing if it is not a directory
fn resolve_directory(directory: &Path) -> Result<PathBuf> {
    let resolved = fs::canonicalize(directory).map_err(|e| {
        Error::invalid_input(
            BuildPhase::FileSelection,
            format!("cannot resolve directory {}: {}", directory.display(), e),
        )
    })?;

    if !resolved.is_dir() {
        return Err(Error::invalid_input(
            BuildPhase::FileSelection,
            format!("{} is not a directory", directory.display()),
        ));
    }

    Ok(resolved)
}

/// Rewrite exclude entries relative to the resolved directory
///
/// Entries are rebuilt from their normal components, so `./a/b` and `a/b/`
/// both become `a/b`. Entries climbing out with `..` can never match and are
/// dropped.
fn normalize_excludes(resolved: &Path, exclude_list: &[PathBuf]) -> Vec<PathBuf> {
    exclude_list
        .iter()
        .filter_map(|entry| {
            let relative = if entry.is_absolute() {
                match entry.strip_prefix(resolved) {
                    Ok(rest) => rest.to_path_buf(),
                    Err(_) => match fs::canonicalize(entry) {
                        Ok(real) => real.strip_prefix(resolved).ok()?.to_path_buf(),
                        Err(_) => return None,
                    },
                }
            } else {
                entry.clone()
            };

            let mut normalized = PathBuf::new();
            for component in relative.components() {
                match component {
                    Component::Normal(part) => normalized.push(part),
                    Component::CurDir => {}
                    Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
                }
            }

            (!normalized.as_os_str().is_empty()).then_some(normalized)
        })
        .collect()
}

fn is_dangling_link(error: &walkdir::Error) -> bool {
    let Some(path) = error.path() else {
        return false;
    };
    let not_found = error
        .io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
    not_found && fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_select_applies_filters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in [
            "src/App.php",
            "src/Http/Kernel.php",
            "src/.hidden.php",
            "src/App.php~",
            ".git/config",
            "composer.json",
            "tests/AppTest.php",
            "docs/guide.md",
            "bin/phpunit",
            "bin/app",
        ] {
            touch(root, rel);
        }

        let files = select(root, &[]).unwrap();
        assert_eq!(
            relative_names(root, &files),
            vec!["bin/app", "src/App.php", "src/Http/Kernel.php"]
        );
    }

    #[test]
    fn test_prefix_is_directory_as_given() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "lib/a.php");

        let given = dir.path().join("lib/");
        let files = select(&given, &[]).unwrap();
        assert_eq!(files, vec![given.join("a.php")]);
    }

    #[test]
    fn test_exclude_list_relative_and_absolute() {
        let dir = TempDir::new().unwrap();
        let vendor = dir.path().join("vendor");
        touch(&vendor, "acme/runtime/src/R.php");
        touch(&vendor, "acme/dev/src/D.php");
        touch(&vendor, "other/tool/src/T.php");
        touch(&vendor, "autoload.php");

        let excludes = vec![
            PathBuf::from("acme/dev/"),
            vendor.canonicalize().unwrap().join("other/tool"),
        ];
        let files = select(&vendor, &excludes).unwrap();
        assert_eq!(
            relative_names(&vendor, &files),
            vec!["acme/runtime/src/R.php", "autoload.php"]
        );

        let dotted = vec![PathBuf::from("./acme/dev"), PathBuf::from("other/./tool/")];
        let files = select(&vendor, &dotted).unwrap();
        assert_eq!(
            relative_names(&vendor, &files),
            vec!["acme/runtime/src/R.php", "autoload.php"]
        );
    }

    #[test]
    fn test_parent_exclude_entry_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/x.php");
        let files = select(&dir.path().join("a"), &[PathBuf::from("../a")]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_hidden_directories_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".github/workflows/ci.yml");
        touch(dir.path(), "src/.cache/x.php");
        touch(dir.path(), "src/App.php");
        let files = select(dir.path(), &[]).unwrap();
        assert_eq!(relative_names(dir.path(), &files), vec!["src/App.php"]);
    }

    #[test]
    fn test_empty_exclude_entry_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.php");
        let files = select(dir.path(), &[PathBuf::from("")]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_segments_above_directory_ignored() {
        // The selected directory itself is named "tests"; only segments below it count
        let dir = TempDir::new().unwrap();
        let tests_dir = dir.path().join("tests");
        touch(&tests_dir, "fixtures.php");

        let files = select(&tests_dir, &[]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = select(&dir.path().join("nope"), &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { phase: BuildPhase::FileSelection, .. }));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.php");
        let err = select(&dir.path().join("a.php"), &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        for rel in ["b.php", "a/z.php", "a/b/c.php", "README.md"] {
            touch(dir.path(), rel);
        }
        let first = select(dir.path(), &[]).unwrap();
        let second = select(dir.path(), &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_filter() {
        struct NoMarkdown;
        impl SelectFilter for NoMarkdown {
            fn name(&self) -> &str {
                "no-markdown"
            }
            fn rejects(&self, candidate: &Candidate<'_>) -> bool {
                candidate.file_name().ends_with(".md")
            }
        }

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "README.md");
        touch(dir.path(), "a.php");

        let selector = FileSelector::new().unwrap().with_filter(Box::new(NoMarkdown));
        let files = selector.select(dir.path(), &[]).unwrap();
        assert_eq!(relative_names(dir.path(), &files), vec!["a.php"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinked_package() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "packages/local/src/L.php");
        touch(dir.path(), "vendor/autoload.php");
        fs::create_dir_all(dir.path().join("vendor/acme")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("packages/local"),
            dir.path().join("vendor/acme/local"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("missing-target"),
            dir.path().join("vendor/dangling"),
        )
        .unwrap();

        let vendor = dir.path().join("vendor");
        let files = select(&vendor, &[]).unwrap();
        assert_eq!(
            relative_names(&vendor, &files),
            vec!["acme/local/src/L.php", "autoload.php"]
        );
    }
}
