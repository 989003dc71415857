// src/cli.rs
//! CLI definitions for pharpack
//!
//! The command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pharpack")]
#[command(author = "pharpack contributors")]
#[command(version)]
#[command(about = "Package a PHP project and its Composer dependencies into one executable PHAR", long_about = None)]
pub struct Cli {
    /// Log every added entry (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a PHAR from a Composer project
    Build {
        /// Path to composer.json or the directory containing it
        manifest: Option<String>,

        /// Output directory for the artifact
        #[arg(short, long)]
        output: Option<String>,

        /// Artifact file name (defaults to <package short name>.phar)
        #[arg(short, long)]
        name: Option<String>,

        /// Entry-point script (defaults to the first "bin" entry)
        #[arg(short, long)]
        entry: Option<String>,

        /// Entry compression: none, gzip, bzip2
        #[arg(short, long)]
        compression: Option<String>,

        /// Additional directory to package (repeatable)
        #[arg(short, long)]
        include: Vec<String>,

        /// Keep dev-only packages and autoload-dev paths
        #[arg(long)]
        keep_dev: bool,

        /// Load settings from a TOML file (pharpack.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Inspect a PHAR file and verify its signature
    Inspect {
        /// Path to the .phar file
        artifact: String,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from([
            "pharpack", "build", "app/composer.json", "-o", "dist", "-c", "gzip", "-i", "res", "-i",
            "tpl", "--keep-dev",
        ])
        .unwrap();

        match cli.command {
            Commands::Build {
                manifest,
                output,
                compression,
                include,
                keep_dev,
                name,
                ..
            } => {
                assert_eq!(manifest.as_deref(), Some("app/composer.json"));
                assert_eq!(output.as_deref(), Some("dist"));
                assert_eq!(compression.as_deref(), Some("gzip"));
                assert_eq!(include, vec!["res", "tpl"]);
                assert!(keep_dev);
                assert!(name.is_none());
            }
            Commands::Inspect { .. } => panic!("expected build"),
        }
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::try_parse_from(["pharpack", "-v", "inspect", "tool.phar", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Inspect { ref artifact, json: true } if artifact == "tool.phar"
        ));
    }
}
