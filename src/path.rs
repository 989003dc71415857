// src/path.rs

//! Archive path normalization
//!
//! Converts paths on disk into the relative, `/`-separated names stored in
//! the archive. The working root is always passed explicitly; nothing here
//! looks at the process working directory.

use crate::error::{BuildPhase, Error, Result};
use std::path::{Component, Path, PathBuf};

/// Make `path` relative to `working_root`
///
/// If `path` is absolute and lies under `working_root`, the root prefix and
/// any leading separator are stripped. Any other path is returned unchanged.
///
/// # Examples
///
/// ```
/// use pharpack::path::to_archive_relative;
/// use std::path::{Path, PathBuf};
///
/// let root = Path::new("/work/project");
/// assert_eq!(
///     to_archive_relative(Path::new("/work/project/src/App.php"), root),
///     PathBuf::from("src/App.php")
/// );
/// assert_eq!(
///     to_archive_relative(Path::new("bin/app"), root),
///     PathBuf::from("bin/app")
/// );
/// assert_eq!(
///     to_archive_relative(Path::new("/elsewhere/lib.php"), root),
///     PathBuf::from("/elsewhere/lib.php")
/// );
/// ```
pub fn to_archive_relative(path: &Path, working_root: &Path) -> PathBuf {
    if !path.is_absolute() {
        return path.to_path_buf();
    }

    match path.strip_prefix(working_root) {
        Ok(rest) => rest
            .components()
            .filter(|c| !matches!(c, Component::RootDir))
            .collect(),
        Err(_) => path.to_path_buf(),
    }
}

/// Render a path as an archive entry name
///
/// Leading separators and `.` components are dropped and the remaining
/// components are joined with `/`. Names containing `..` or resolving to
/// nothing are rejected.
///
/// ```
/// use pharpack::path::archive_name;
/// use std::path::Path;
///
/// assert_eq!(archive_name(Path::new("./src/App.php")).unwrap(), "src/App.php");
/// assert_eq!(archive_name(Path::new("/abs/lib.php")).unwrap(), "abs/lib.php");
/// assert!(archive_name(Path::new("../outside.php")).is_err());
/// ```
pub fn archive_name(path: &Path) -> Result<String> {
    let mut parts = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(c) => parts.push(c.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(Error::invalid_input(
                    BuildPhase::Ingestion,
                    format!("archive path escapes the archive root: {}", path.display()),
                ));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::invalid_input(
            BuildPhase::Ingestion,
            format!("empty archive path: '{}'", path.display()),
        ));
    }

    Ok(parts.join("/"))
}

/// Resolve `path` against `root` when it is relative
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Remove trailing separators from a path
///
/// A bare root (`/`) is kept as is.
pub fn trim_trailing_separators(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let trimmed = text.trim_end_matches(std::path::is_separator);
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_under_root() {
        let root = Path::new("/srv/app");
        assert_eq!(
            to_archive_relative(Path::new("/srv/app/vendor/autoload.php"), root),
            PathBuf::from("vendor/autoload.php")
        );
    }

    #[test]
    fn test_root_with_trailing_separator() {
        let root = Path::new("/srv/app/");
        assert_eq!(
            to_archive_relative(Path::new("/srv/app/bin/run"), root),
            PathBuf::from("bin/run")
        );
    }

    #[test]
    fn test_sibling_prefix_is_not_under_root() {
        // "/srv/application" shares a string prefix with "/srv/app" but is not under it
        let root = Path::new("/srv/app");
        assert_eq!(
            to_archive_relative(Path::new("/srv/application/x.php"), root),
            PathBuf::from("/srv/application/x.php")
        );
    }

    #[test]
    fn test_relative_input_unchanged() {
        let root = Path::new("/srv/app");
        assert_eq!(
            to_archive_relative(Path::new("src/Kernel.php"), root),
            PathBuf::from("src/Kernel.php")
        );
    }

    #[test]
    fn test_archive_name_normalizes() {
        assert_eq!(archive_name(Path::new("src//Foo/./Bar.php")).unwrap(), "src/Foo/Bar.php");
        assert_eq!(archive_name(Path::new("composer.json")).unwrap(), "composer.json");
    }

    #[test]
    fn test_archive_name_rejects_traversal_and_empty() {
        assert!(archive_name(Path::new("src/../../etc/passwd")).is_err());
        assert!(archive_name(Path::new("/")).is_err());
        assert!(archive_name(Path::new(".")).is_err());
    }

    #[test]
    fn test_trim_trailing_separators() {
        assert_eq!(trim_trailing_separators(Path::new("build/")), PathBuf::from("build"));
        assert_eq!(trim_trailing_separators(Path::new("build//")), PathBuf::from("build"));
        assert_eq!(trim_trailing_separators(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_resolve_under() {
        let root = Path::new("/srv/app");
        assert_eq!(resolve_under(root, Path::new("bin/app")), PathBuf::from("/srv/app/bin/app"));
        assert_eq!(resolve_under(root, Path::new("/opt/lib")), PathBuf::from("/opt/lib"));
    }
}
