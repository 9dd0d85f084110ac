// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use clap::Parser;
use fluxion_rce::RceConfig;
use fluxion_rce_cli::cli::{Cli, Commands};
use fluxion_rce_cli::commands;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    init_logging(&config)?;

    let tz = config.tz()?;
    let now = commands::current_time(cli.at.as_deref(), tz)?;
    info!("Evaluating at {now} ({tz})");

    let output = match &cli.command {
        Commands::Metrics(args) => {
            let snapshot = commands::load_snapshot(cli.input.as_deref(), &config, now)?;
            Some(commands::metrics(&snapshot, &config, now, args)?)
        }
        Commands::CheapestWindow(args) => {
            let snapshot = commands::load_snapshot(cli.input.as_deref(), &config, now)?;
            Some(commands::cheapest_window(&snapshot, &config, now, args)?)
        }
        Commands::TopWindows(args) => {
            let snapshot = commands::load_snapshot(cli.input.as_deref(), &config, now)?;
            Some(commands::top_windows(&snapshot, &config, now, args)?)
        }
        Commands::Fetch(args) => commands::fetch(&config, now, args)?,
    };

    if let Some(output) = output {
        println!("{output}");
    }
    Ok(())
}

/// Logs go to stderr, stdout carries command output
fn init_logging(config: &RceConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}
