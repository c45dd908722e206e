//! Command-line parsing for the SPI forecast dashboard.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code. Selectable values (countries, years) are restricted here so
//! invalid selections are rejected before they reach the pipeline.

use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};

use crate::data::COUNTRIES;
use crate::domain::{DEFAULT_COUNTRY, DEFAULT_YEAR, DebtPolicy, FORECAST_HORIZON};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "spi", version, about = "Societal Pressure Index dashboard with ML forecast")]
pub struct Cli {
    /// Append logs to this file (the TUI logs nothing without it).
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard.
    Tui(RunArgs),
    /// Request a forecast once, print the timeline, and optionally export it.
    Forecast(ForecastArgs),
    /// Print the synthesized snapshot batch for a country.
    Snapshots(SnapshotArgs),
    /// List the country presets.
    Countries,
}

/// Selection and service options shared by `tui` and `forecast`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Country preset.
    #[arg(
        short,
        long,
        default_value = DEFAULT_COUNTRY,
        value_parser = PossibleValuesParser::new(COUNTRIES)
    )]
    pub country: String,

    /// Year shown alongside the forecast.
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_YEAR,
        value_parser = clap::value_parser!(u16).range(2020..=2025)
    )]
    pub year: u16,

    /// Base URL of the prediction service (falls back to SPI_API_URL).
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds (falls back to SPI_TIMEOUT_SECS, then 20).
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Handling of debt that would fall below zero.
    #[arg(long, value_enum, default_value_t = DebtPolicy::PassThrough)]
    pub debt_policy: DebtPolicy,
}

/// Options for a one-shot forecast.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the timeline to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export the timeline to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

/// Options for printing a snapshot batch.
#[derive(Debug, Args, Clone)]
pub struct SnapshotArgs {
    /// Country preset.
    #[arg(
        short,
        long,
        default_value = DEFAULT_COUNTRY,
        value_parser = PossibleValuesParser::new(COUNTRIES)
    )]
    pub country: String,

    /// Number of synthetic steps.
    #[arg(long, default_value_t = FORECAST_HORIZON)]
    pub steps: usize,

    /// Handling of debt that would fall below zero.
    #[arg(long, value_enum, default_value_t = DebtPolicy::PassThrough)]
    pub debt_policy: DebtPolicy,

    /// Print the `/predict` request body instead of a table.
    #[arg(long)]
    pub json: bool,
}
