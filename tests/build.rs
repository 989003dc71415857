// tests/build.rs

//! End-to-end builds of fixture Composer projects.

mod common;

use common::{Project, write_file};
use pharpack::manifest::{ManifestSource, SourcePaths};
use pharpack::{BuildConfig, BuildPhase, Builder, CompressionMode, Error, PharArchive, SilentReporter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn build(config: BuildConfig) -> pharpack::Result<pharpack::BuildSummary> {
    Builder::new(config)
        .with_reporter(Arc::new(SilentReporter))
        .build()
}

#[test]
fn test_standard_project_entries() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();

    let summary = build(project.config(out.path())).unwrap();
    let archive = PharArchive::open(&summary.path).unwrap();

    assert_eq!(
        archive.entry_names(),
        vec![
            "bin/greet",
            "composer.json",
            "composer.lock",
            "src/Format/Banner.php",
            "src/Greeter.php",
            "vendor/acme/strings/src/Str.php",
            "vendor/autoload.php",
            "vendor/composer/autoload_real.php",
            "vendor/composer/installed.json",
        ]
    );
    assert_eq!(archive.alias(), "greeter.phar");
    assert!(
        archive
            .stub_str()
            .contains("include \"phar://greeter.phar/bin/greet\"")
    );
    assert!(archive.stub_str().ends_with("__HALT_COMPILER(); ?>\r\n"));
}

#[test]
fn test_round_trip_minimal_project() {
    let project = Project::with_manifest(r#"{"autoload": {"classmap": ["lib/"]}}"#);
    project.write("composer.lock", r#"{"packages": [], "packages-dev": []}"#);
    project.write("lib/a.php", "#!/usr/bin/env php\n<?php echo 'a';");
    project.write("lib/b.php", "<?php echo 'b';");
    let out = TempDir::new().unwrap();

    let config = BuildConfig::new(project.manifest(), "min.phar", "lib/a.php").with_output_dir(out.path());
    let summary = build(config).unwrap();

    let archive = PharArchive::open(&summary.path).unwrap();
    assert_eq!(
        archive.entry_names(),
        vec!["composer.json", "composer.lock", "lib/a.php", "lib/b.php"]
    );
    assert_eq!(archive.read("lib/a.php").unwrap(), b"<?php echo 'a';");
    assert_eq!(archive.read("lib/b.php").unwrap(), b"<?php echo 'b';");
    assert!(archive.stub_str().contains("phar://min.phar/lib/a.php"));
}

#[test]
fn test_dev_package_excluded() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();

    let summary = build(project.config(out.path())).unwrap();
    let archive = PharArchive::open(&summary.path).unwrap();
    assert!(!archive.entry_names().iter().any(|n| n.contains("pkg/dev")));

    let summary = build(project.config(out.path()).with_keep_dev(true)).unwrap();
    let archive = PharArchive::open(&summary.path).unwrap();
    assert!(archive.entry_names().contains(&"vendor/pkg/dev/src/DevTool.php"));
}

#[test]
fn test_build_twice_keeps_only_second_build() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();

    build(project.config(out.path())).unwrap();

    fs::remove_file(project.root().join("src/Format/Banner.php")).unwrap();
    project.write("src/Format/Frame.php", "<?php // frame");
    let summary = build(project.config(out.path())).unwrap();

    let archive = PharArchive::open(&summary.path).unwrap();
    let names = archive.entry_names();
    assert!(names.contains(&"src/Format/Frame.php"));
    assert!(!names.contains(&"src/Format/Banner.php"));

    let artifacts: Vec<_> = fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(artifacts, vec!["greeter.phar"]);
}

#[test]
fn test_failure_leaves_no_artifact() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();
    build(project.config(out.path())).unwrap();
    assert!(out.path().join("greeter.phar").exists());

    // autoload.files entry that does not exist aborts ingestion
    project.write(
        "composer.json",
        r#"{"name": "acme/greeter", "autoload": {"files": ["src/missing.php"]}, "bin": ["bin/greet"]}"#,
    );
    let err = build(project.config(out.path())).unwrap_err();

    assert_eq!(err.phase(), BuildPhase::Ingestion);
    assert!(err.to_string().contains("missing.php"));
    assert!(!out.path().join("greeter.phar").exists());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_output_directory() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();

    let config = project.config(&out.path().join("does/not/exist"));
    let err = build(config).unwrap_err();
    assert!(matches!(err, Error::ArtifactCreate { .. }));
    assert_eq!(err.phase(), BuildPhase::ArchiveCreation);
}

#[test]
fn test_output_dir_trailing_separator() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();

    let with_slash = format!("{}/", out.path().display());
    let summary = build(project.config(Path::new(&with_slash))).unwrap();
    assert_eq!(summary.path, out.path().join("greeter.phar"));
}

#[test]
fn test_compressed_entries_round_trip() {
    for mode in [CompressionMode::Gzip, CompressionMode::Bzip2] {
        let project = Project::standard();
        let body = "<?php\n".to_string() + &"// lorem ipsum dolor sit amet\n".repeat(200);
        project.write("src/Large.php", &body);
        project.write("src/Asset.bin", "\u{0}\u{1}\u{2}");
        let out = TempDir::new().unwrap();

        let summary = build(project.config(out.path()).with_compression(mode)).unwrap();
        let archive = PharArchive::open(&summary.path).unwrap();

        let large = archive
            .entries()
            .iter()
            .find(|e| e.name == "src/Large.php")
            .unwrap();
        assert_eq!(large.compression, mode.name());
        assert!(large.stored_size < large.size);
        assert_eq!(archive.read("src/Large.php").unwrap(), body.as_bytes());

        let asset = archive
            .entries()
            .iter()
            .find(|e| e.name == "src/Asset.bin")
            .unwrap();
        assert_eq!(asset.compression, "none");

        // Every entry decompresses and passes its CRC check
        for name in archive.entry_names() {
            archive.read(name).unwrap();
        }
        assert_eq!(archive.signature().algorithm, "SHA-256");
    }
}

#[test]
fn test_corrupted_artifact_rejected() {
    let project = Project::standard();
    let out = TempDir::new().unwrap();
    let summary = build(project.config(out.path())).unwrap();

    let mut bytes = fs::read(&summary.path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&summary.path, bytes).unwrap();

    let err = PharArchive::open(&summary.path).unwrap_err();
    assert!(matches!(err, Error::MalformedArchive { .. }));
}

#[test]
fn test_extra_include_directories() {
    let project = Project::standard();
    write_file(project.root(), "resources/views/home.html", "<h1>hi</h1>");
    write_file(project.root(), "resources/views/.DS_Store", "x");
    let out = TempDir::new().unwrap();

    let config = project.config(out.path()).with_include_dir("resources/");
    let summary = build(config).unwrap();
    let archive = PharArchive::open(&summary.path).unwrap();
    let names = archive.entry_names();
    assert!(names.contains(&"resources/views/home.html"));
    assert!(!names.iter().any(|n| n.ends_with(".DS_Store")));
}

/// Layout provided in code rather than read from composer.json
struct StaticSource {
    root: PathBuf,
}

impl ManifestSource for StaticSource {
    fn manifest_dir(&self) -> &Path {
        &self.root
    }

    fn source_paths(&self, _include_dev: bool) -> SourcePaths {
        SourcePaths {
            dirs: vec![PathBuf::from("app")],
            files: vec![],
        }
    }

    fn vendor_dir(&self) -> PathBuf {
        PathBuf::from("deps")
    }

    fn dev_only_packages(&self) -> Vec<String> {
        vec!["tools/lint".to_string()]
    }

    fn descriptor_files(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("project.json")]
    }
}

#[test]
fn test_build_with_custom_source() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write_file(&root, "project.json", "{}");
    write_file(&root, "app/main.php", "<?php main();");
    write_file(&root, "deps/tools/lint/Lint.php", "<?php");
    write_file(&root, "deps/libs/http/Client.php", "<?php");
    let out = TempDir::new().unwrap();

    let config = BuildConfig::new(root.join("project.json"), "app.phar", "app/main.php")
        .with_output_dir(out.path());
    let source = StaticSource { root };
    let summary = Builder::new(config)
        .with_reporter(Arc::new(SilentReporter))
        .build_with_source(&source)
        .unwrap();

    let archive = PharArchive::open(&summary.path).unwrap();
    assert_eq!(
        archive.entry_names(),
        vec!["app/main.php", "deps/libs/http/Client.php", "project.json"]
    );
}
