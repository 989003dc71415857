// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("pharpack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pharpack contributors")
        .about("Package a PHP project and its Composer dependencies into one executable PHAR")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log every added entry (same as RUST_LOG=debug)"),
        )
        .subcommand(
            Command::new("build")
                .about("Build a PHAR from a Composer project")
                .arg(Arg::new("manifest").help("Path to composer.json or the directory containing it"))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output directory for the artifact"),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Artifact file name (defaults to <package short name>.phar)"),
                )
                .arg(
                    Arg::new("entry")
                        .short('e')
                        .long("entry")
                        .help("Entry-point script (defaults to the first \"bin\" entry)"),
                )
                .arg(
                    Arg::new("compression")
                        .short('c')
                        .long("compression")
                        .help("Entry compression: none, gzip, bzip2"),
                )
                .arg(
                    Arg::new("include")
                        .short('i')
                        .long("include")
                        .action(ArgAction::Append)
                        .help("Additional directory to package (repeatable)"),
                )
                .arg(
                    Arg::new("keep_dev")
                        .long("keep-dev")
                        .action(ArgAction::SetTrue)
                        .help("Keep dev-only packages and autoload-dev paths"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("Load settings from a TOML file (pharpack.toml)"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect a PHAR file and verify its signature")
                .arg(Arg::new("artifact").required(true).help("Path to the .phar file"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of a listing"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pharpack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
