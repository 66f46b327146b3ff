// Copyright 2026 factfetch contributors
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code, unused_imports)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;
mod config;
mod download;
mod jurisdiction;
mod model;
mod orchestrator;
mod runlog;
mod session;
mod sink;
mod sources;
mod store;

#[derive(Parser)]
#[command(
    name = "factfetch",
    about = "factfetch — factsheet PDF retrieval for ISIN lists",
    version,
    after_help = "Run 'factfetch <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch factsheets for every security in a sources file
    Fetch {
        /// JSON sources file: [{"isin": "...", "name": "...", "record_ref"?: "..."}]
        #[arg(long)]
        sources: PathBuf,
        /// Optional JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Entry URL of the fund site (overrides the config file)
        #[arg(long)]
        base_url: Option<String>,
        /// Attempts per security before abandoning it
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "factfetch=debug"
    } else if cli.quiet {
        "factfetch=error"
    } else {
        "factfetch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap()),
        )
        .init();

    let result = match cli.command {
        Commands::Fetch {
            sources,
            config,
            base_url,
            max_retries,
        } => {
            cli::fetch_cmd::run(cli::fetch_cmd::FetchArgs {
                sources,
                config,
                base_url,
                max_retries,
            })
            .await
        }
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "factfetch", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
