//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - resolves the prediction service configuration
//! - dispatches to the TUI or the headless commands

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ForecastArgs, RunArgs, SnapshotArgs};
use crate::data::{lookup, synthesize_with};
use crate::domain::{DEFAULT_TIMEOUT_SECS, ForecastConfig};
use crate::error::AppError;

pub mod pipeline;

const ENV_API_URL: &str = "SPI_API_URL";
const ENV_TIMEOUT_SECS: &str = "SPI_TIMEOUT_SECS";

/// Entry point for the `spi` binary.
pub fn run() -> Result<(), AppError> {
    // `spi` and `spi -c Germany` behave like `spi tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    init_logging(&cli)?;

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Forecast(args) => handle_forecast(args),
        Command::Snapshots(args) => handle_snapshots(args),
        Command::Countries => {
            print!("{}", crate::report::format_catalog());
            Ok(())
        }
    }
}

fn handle_tui(args: RunArgs) -> Result<(), AppError> {
    let config = forecast_config_from_args(&args)?;
    crate::tui::run(&args, &config)
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let config = forecast_config_from_args(&args.run)?;
    let run = pipeline::run_forecast(&config, &args.run.country, args.run.year)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.country, run.year, &run.state)
    );
    println!("{}", crate::report::format_timeline(&run.timeline));

    if !args.no_plot {
        let plot = crate::plot::render_ascii_plot(&run.timeline, args.width, args.height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_timeline_json(path, &run.timeline, &run.country, run.year)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::write_timeline_csv(path, &run.timeline)?;
    }

    match run.state.error() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
}

fn handle_snapshots(args: SnapshotArgs) -> Result<(), AppError> {
    let baseline = lookup(&args.country)?;
    let batch = synthesize_with(&baseline, args.steps, args.debt_policy);

    if args.json {
        let body = serde_json::to_string_pretty(&batch)
            .map_err(|e| AppError::new(4, format!("Failed to encode snapshots: {e}")))?;
        println!("{body}");
    } else {
        print!("{}", crate::report::format_batch(&args.country, &batch));
    }
    Ok(())
}

/// Build the pipeline configuration from CLI flags, falling back to the
/// environment (and `.env`).
pub fn forecast_config_from_args(args: &RunArgs) -> Result<ForecastConfig, AppError> {
    dotenvy::dotenv().ok();
    resolve_config(args, |key| std::env::var(key).ok())
}

fn resolve_config(
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ForecastConfig, AppError> {
    let api_url = args
        .api_url
        .clone()
        .or_else(|| env(ENV_API_URL))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing prediction service URL: pass --api-url or set {ENV_API_URL} (.env)."),
            )
        })?;

    let timeout_secs = match args.timeout_secs {
        Some(secs) => secs,
        None => match env(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::new(2, format!("Invalid {ENV_TIMEOUT_SECS} '{raw}': {e}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        },
    };
    if timeout_secs == 0 {
        return Err(AppError::new(2, "Request timeout must be > 0 seconds."));
    }

    Ok(ForecastConfig {
        api_url,
        timeout: Duration::from_secs(timeout_secs),
        debt_policy: args.debt_policy,
    })
}

/// Install the tracing subscriber.
///
/// Headless commands log to stderr. The TUI owns the terminal, so it logs
/// only when `--log-file` is given.
fn init_logging(cli: &Cli) -> Result<(), AppError> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match (&cli.log_file, &cli.command) {
        (Some(path), _) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::new(2, format!("Failed to open log file '{}': {e}", path.display())))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        (None, Command::Tui(_)) => {}
        (None, _) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
        }
    }
    Ok(())
}

/// Rewrite argv so `spi` defaults to `spi tui`.
///
/// Rules:
/// - `spi`                      -> `spi tui`
/// - `spi -c Germany ...`       -> `spi tui -c Germany ...`
/// - `spi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "tui" | "forecast" | "snapshots" | "countries"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::DebtPolicy;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn run_args() -> RunArgs {
        RunArgs {
            country: "Finland".to_string(),
            year: 2024,
            api_url: None,
            timeout_secs: None,
            debt_policy: DebtPolicy::PassThrough,
        }
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn rewrite_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["spi"])), argv(&["spi", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["spi", "-c", "USA"])),
            argv(&["spi", "tui", "-c", "USA"])
        );
        assert_eq!(rewrite_args(argv(&["spi", "--help"])), argv(&["spi", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["spi", "forecast", "-c", "USA"])),
            argv(&["spi", "forecast", "-c", "USA"])
        );
    }

    #[test]
    fn config_prefers_flags_over_environment() {
        let mut args = run_args();
        args.api_url = Some("http://flag:9000".to_string());
        args.timeout_secs = Some(5);

        let env = env_of(&[(ENV_API_URL, "http://env:8000"), (ENV_TIMEOUT_SECS, "30")]);
        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.api_url, "http://flag:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_falls_back_to_environment_and_defaults() {
        let config = resolve_config(&run_args(), env_of(&[(ENV_API_URL, " http://env:8000 ")])).unwrap();
        assert_eq!(config.api_url, "http://env:8000");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config = resolve_config(
            &run_args(),
            env_of(&[(ENV_API_URL, "http://env:8000"), (ENV_TIMEOUT_SECS, "12")]),
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn config_errors_are_usage_errors() {
        let missing = resolve_config(&run_args(), env_of(&[])).unwrap_err();
        assert_eq!(missing.exit_code(), 2);

        let bad_timeout = resolve_config(
            &run_args(),
            env_of(&[(ENV_API_URL, "http://env:8000"), (ENV_TIMEOUT_SECS, "soon")]),
        )
        .unwrap_err();
        assert_eq!(bad_timeout.exit_code(), 2);

        let mut args = run_args();
        args.api_url = Some("http://flag:9000".to_string());
        args.timeout_secs = Some(0);
        assert!(resolve_config(&args, env_of(&[])).is_err());
    }
}
