//! Kiln - a rule-based front-end asset pipeline.

mod artifact;
mod cli;
mod config;
mod core;
mod embed;
mod hooks;
mod logger;
mod pipeline;
mod rules;
mod transform;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::KilnConfig;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    // Ctrl+C cancels running steps (and unblocks the dev server)
    let cancel = core::CancelToken::new();
    core::setup_shutdown_handler(cancel.clone())?;

    let config = Arc::new(KilnConfig::load(&cli)?);

    match &cli.command {
        Commands::Build { .. } => {
            let report = cli::build::build_project(config, cancel)?;
            if !report.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Serve { .. } => cli::serve::serve_project(config, cancel),
        Commands::Rules { ids } => cli::rules::print_rules(&config, ids),
    }
}
