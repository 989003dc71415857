// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pharpack::BuildConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Fixture Composer project.
///
/// Keep the returned value alive for as long as the files are needed.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// Empty project holding only `composer.json`.
    pub fn with_manifest(json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "composer.json", json);
        Self { dir }
    }

    /// Project with sources, a binary, a lock file and installed
    /// dependencies, one of them dev-only (`pkg/dev`).
    pub fn standard() -> Self {
        let project = Self::with_manifest(
            r#"{
    "name": "acme/greeter",
    "autoload": {"psr-4": {"Acme\\Greeter\\": "src/"}},
    "autoload-dev": {"psr-4": {"Acme\\Greeter\\Tests\\": "tests/"}},
    "require": {"php": ">=8.1", "acme/strings": "^2.0"},
    "require-dev": {"pkg/dev": "^1.0"},
    "bin": ["bin/greet"]
}"#,
        );
        project.write(
            "composer.lock",
            r#"{
    "packages": [{"name": "acme/strings", "version": "2.1.0"}],
    "packages-dev": [{"name": "pkg/dev", "version": "1.4.0"}]
}"#,
        );
        project.write(
            "bin/greet",
            "#!/usr/bin/env php\n<?php\nrequire __DIR__ . '/../vendor/autoload.php';\n(new Acme\\Greeter\\Greeter())->run($argv);\n",
        );
        project.write(
            "src/Greeter.php",
            "<?php\nnamespace Acme\\Greeter;\n\nfinal class Greeter\n{\n    public function run(array $argv): void { echo \"hello\\n\"; }\n}\n",
        );
        project.write("src/Format/Banner.php", "<?php\nnamespace Acme\\Greeter\\Format;\n\nfinal class Banner {}\n");
        project.write("tests/GreeterTest.php", "<?php // test");
        project.write("README.md", "# greeter");
        project.write(".gitignore", "vendor/");
        project.write(".git/HEAD", "ref: refs/heads/main");
        project.write("vendor/autoload.php", "<?php return require __DIR__ . '/composer/autoload_real.php';");
        project.write("vendor/composer/autoload_real.php", "<?php // generated");
        project.write("vendor/composer/installed.json", "{\"packages\": []}");
        project.write("vendor/acme/strings/src/Str.php", "<?php\nnamespace Acme\\Strings;\n\nfinal class Str {}\n");
        project.write("vendor/acme/strings/composer.json", "{\"name\": \"acme/strings\"}");
        project.write("vendor/acme/strings/tests/StrTest.php", "<?php // test");
        project.write("vendor/acme/strings/docs/index.md", "# docs");
        project.write("vendor/pkg/dev/src/DevTool.php", "<?php // dev only");
        project.write("vendor/bin/phpunit", "#!/usr/bin/env php\n<?php");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest(&self) -> PathBuf {
        self.root().join("composer.json")
    }

    pub fn write(&self, rel: &str, content: &str) {
        write_file(self.root(), rel, content);
    }

    /// Configuration building `greeter.phar` into `out`.
    pub fn config(&self, out: &Path) -> BuildConfig {
        BuildConfig::new(self.manifest(), "greeter.phar", "bin/greet").with_output_dir(out)
    }
}
