//! Shared one-shot forecast pipeline used by the headless CLI.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! preset lookup -> snapshot synthesis -> prediction call -> reconciliation
//!
//! The TUI drives the same orchestrator incrementally from its event loop.

use tracing::info;

use crate::domain::{DebtPolicy, ForecastConfig, RequestState, TimelineSeries};
use crate::error::AppError;
use crate::forecast::{ForecastClient, ForecastOrchestrator, HttpForecastClient};

/// All computed outputs of a single `spi forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub country: String,
    pub year: u16,
    pub state: RequestState,
    pub timeline: TimelineSeries,
}

/// Run the pipeline against the configured prediction service.
pub fn run_forecast(config: &ForecastConfig, country: &str, year: u16) -> Result<RunOutput, AppError> {
    let client = HttpForecastClient::new(config)?;
    info!(endpoint = client.endpoint(), "using prediction service");
    run_forecast_with(client, config.debt_policy, country, year)
}

/// Run the pipeline with a caller-supplied client.
///
/// A failed forecast is not an error here: it is reported through
/// `RunOutput::state` so the caller can still render the actual series.
/// Only an invalid selection (unknown country) returns `Err`.
pub fn run_forecast_with<C: ForecastClient + 'static>(
    client: C,
    debt_policy: DebtPolicy,
    country: &str,
    year: u16,
) -> Result<RunOutput, AppError> {
    let mut orchestrator = ForecastOrchestrator::new(client).with_debt_policy(debt_policy);
    orchestrator.request_forecast(country)?;
    let state = orchestrator.wait().clone();

    Ok(RunOutput {
        country: country.to_string(),
        year,
        timeline: orchestrator.timeline(),
        state,
    })
}
