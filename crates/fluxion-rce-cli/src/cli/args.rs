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

//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fluxion_rce::service::{DEFAULT_SERVICE_END_HOUR, DEFAULT_SERVICE_START_HOUR};

#[derive(Debug, Parser)]
#[command(name = "fluxion-rce")]
#[command(author, version, about = "RCE electricity price windows")]
#[command(
    long_about = "Best and worst price windows, daily statistics and derived metrics\n\
    for the 15-minute RCE prices published by PSE.\n\
    \nPrices are fetched from the PSE API for today and tomorrow, or read from\n\
    a JSON file saved earlier with `fetch --output`.\n\
    \nExamples:\n  \
    fluxion-rce metrics                              # All metrics, right now\n  \
    fluxion-rce cheapest-window --duration 3         # Cheapest 3h between 08 and 16\n  \
    fluxion-rce top-windows --day tomorrow --count 3 # Three most expensive hours tomorrow\n  \
    fluxion-rce fetch --date 2024-06-02 --output prices.json"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Path to a TOML config file (defaults are used when omitted)"
    )]
    pub config: Option<PathBuf>,

    /// Read records from a file instead of the API
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Read price records from a JSON file instead of calling the API",
        long_help = "Read price records from a JSON file instead of calling the API.\n\
          \nAccepts the API response ({\"value\": [...]}) or a bare array of records."
    )]
    pub input: Option<PathBuf>,

    /// Evaluate at a fixed wall-clock time
    #[arg(
        long,
        global = true,
        value_name = "YYYY-MM-DD HH:MM",
        help = "Evaluate at this wall-clock time in the configured zone instead of now"
    )]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate every derived metric
    #[command(
        long_about = "Evaluate every derived metric for today and tomorrow.\n\
        \nUnavailable metrics (e.g. tomorrow before publication) are shown as 'unavailable'.\n\
        \nExamples:\n  \
        fluxion-rce metrics\n  \
        fluxion-rce metrics --available-only --json\n  \
        fluxion-rce --input prices.json --at '2024-06-02 12:10' metrics"
    )]
    Metrics(MetricsArgs),

    /// Find the cheapest window in today's prices
    #[command(
        long_about = "Find the cheapest run of whole hours in today's prices.\n\
        \nThe window must start at or after --start-hour and end by --end-hour.\n\
        Hourly prices in the result are averages of the four 15-minute periods.\n\
        \nExamples:\n  \
        fluxion-rce cheapest-window --duration 2\n  \
        fluxion-rce cheapest-window --duration 4 --start-hour 0 --end-hour 24 --json"
    )]
    CheapestWindow(CheapestWindowArgs),

    /// Rank the best windows starting on a full hour
    #[command(
        long_about = "Rank windows that start on a full hour by their average price.\n\
        \nThe most expensive windows are listed unless --lowest is given.\n\
        \nExamples:\n  \
        fluxion-rce top-windows\n  \
        fluxion-rce top-windows --day tomorrow --start-hour 17 --end-hour 21 --count 3\n  \
        fluxion-rce top-windows --lowest --duration 2 --allow-same-start-hour"
    )]
    TopWindows(TopWindowsArgs),

    /// Download one business day of prices
    #[command(
        long_about = "Download one business day of prices from the PSE API.\n\
        \nThe saved file can be fed back with --input.\n\
        \nExamples:\n  \
        fluxion-rce fetch\n  \
        fluxion-rce fetch --date 2024-06-02 --output prices.json"
    )]
    Fetch(FetchArgs),
}

#[derive(Debug, Parser)]
pub struct MetricsArgs {
    #[arg(
        long,
        default_value_t = false,
        help = "Skip metrics that have no value right now"
    )]
    pub available_only: bool,

    #[arg(long, default_value_t = false, help = "Print a JSON object instead of a table")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CheapestWindowArgs {
    /// Window length in whole hours
    #[arg(
        long,
        help = "Window length in whole hours (1-8)",
        long_help = "Window length in whole hours, between 1 and 8.\n\
          \nFractional values such as 2.5 are rejected."
    )]
    pub duration: String,

    #[arg(
        long,
        default_value_t = DEFAULT_SERVICE_START_HOUR,
        help = "Earliest hour the window may start at (0-23)"
    )]
    pub start_hour: u32,

    #[arg(
        long,
        default_value_t = DEFAULT_SERVICE_END_HOUR,
        help = "Hour the window must end by (1-24)"
    )]
    pub end_hour: u32,

    #[arg(long, default_value_t = false, help = "Print the response as JSON")]
    pub json: bool,
}

/// Which business day to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DayArg {
    Today,
    Tomorrow,
}

#[derive(Debug, Parser)]
pub struct TopWindowsArgs {
    #[arg(long, value_enum, default_value_t = DayArg::Today, help = "Business day to search")]
    pub day: DayArg,

    #[arg(long, default_value_t = 0, help = "Earliest start hour (0-23)")]
    pub start_hour: u32,

    #[arg(long, default_value_t = 24, help = "Latest end hour (1-24)")]
    pub end_hour: u32,

    #[arg(
        long,
        default_value_t = 1.0,
        help = "Window length in hours, must be a whole number"
    )]
    pub duration: f64,

    #[arg(long, default_value_t = 2, help = "Number of windows to list")]
    pub count: usize,

    #[arg(
        long,
        default_value_t = false,
        help = "Rank the cheapest windows instead of the most expensive"
    )]
    pub lowest: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Allow several windows with the same start hour"
    )]
    pub allow_same_start_hour: bool,

    #[arg(long, default_value_t = false, help = "Print the windows as JSON")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct FetchArgs {
    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Business day to download (defaults to today)"
    )]
    pub date: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Write the records to this file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cheapest_window_defaults() {
        let cli = Cli::try_parse_from(["fluxion-rce", "cheapest-window", "--duration", "3"]).unwrap();
        let Commands::CheapestWindow(args) = cli.command else {
            panic!("expected cheapest-window");
        };
        assert_eq!(args.duration, "3");
        assert_eq!(args.start_hour, 8);
        assert_eq!(args.end_hour, 16);
        assert!(!args.json);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fluxion-rce",
            "metrics",
            "--input",
            "prices.json",
            "--at",
            "2024-06-02 12:10",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.input, Some(PathBuf::from("prices.json")));
        assert_eq!(cli.at.as_deref(), Some("2024-06-02 12:10"));
        assert!(matches!(cli.command, Commands::Metrics(MetricsArgs { json: true, .. })));
    }

    #[test]
    fn test_top_windows_flags() {
        let cli = Cli::try_parse_from([
            "fluxion-rce",
            "top-windows",
            "--day",
            "tomorrow",
            "--count",
            "3",
            "--lowest",
            "--allow-same-start-hour",
        ])
        .unwrap();
        let Commands::TopWindows(args) = cli.command else {
            panic!("expected top-windows");
        };
        assert_eq!(args.day, DayArg::Tomorrow);
        assert_eq!(args.count, 3);
        assert_eq!(args.duration, 1.0);
        assert!(args.lowest);
        assert!(args.allow_same_start_hour);
    }

    #[test]
    fn test_cheapest_window_requires_duration() {
        assert!(Cli::try_parse_from(["fluxion-rce", "cheapest-window"]).is_err());
    }
}
