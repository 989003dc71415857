// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::BuildOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            name,
            entry,
            compression,
            include,
            keep_dev,
            config,
        } => commands::cmd_build(BuildOptions {
            manifest,
            output,
            name,
            entry,
            compression,
            include,
            keep_dev,
            config,
        }),
        Commands::Inspect { artifact, json } => commands::cmd_inspect(&artifact, json),
    }
}
