//! Terminal output formatting.
//!
//! Formatting lives here so the pipeline code stays free of presentation and
//! output changes are localized.

use crate::data::PRESETS;
use crate::domain::{RequestState, SnapshotBatch, TimelineSeries};

/// Header block for a forecast run.
pub fn format_run_summary(country: &str, year: u16, state: &RequestState) -> String {
    let mut out = String::new();
    out.push_str("=== spi - Societal Pressure Index ===\n");
    out.push_str("Lower is better: the index rises with living cost and debt relative to income.\n");
    out.push_str(&format!("Country: {country} | Year: {year}\n"));

    match state {
        RequestState::Succeeded(_) => {
            out.push_str(&format!("Forecasting SPI for {country} in {year}\n"));
        }
        RequestState::Failed(err) => {
            out.push_str(&format!("Forecast failed: {err}\n"));
        }
        RequestState::Idle | RequestState::InFlight => {
            out.push_str(&format!("Forecast: {}\n", state.label()));
        }
    }
    out
}

/// Step-by-step table of the reconciled timeline.
pub fn format_timeline(series: &TimelineSeries) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>4}  {:>8}  {:>8}\n", "step", "actual", "forecast"));

    let forecast = series.forecast.as_deref().unwrap_or(&[]);
    for (i, label) in series.labels.iter().enumerate() {
        let actual = series.actual.get(i).map(|v| format!("{v:.2}"));
        let predicted = i
            .checked_sub(series.actual.len())
            .and_then(|j| forecast.get(j))
            .map(|v| format!("{v:.2}"));
        out.push_str(&format!(
            "{:>4}  {:>8}  {:>8}\n",
            label,
            actual.as_deref().unwrap_or("-"),
            predicted.as_deref().unwrap_or("-"),
        ));
    }
    out
}

/// Table of a synthesized snapshot batch.
pub fn format_batch(country: &str, batch: &SnapshotBatch) -> String {
    let mut out = String::new();
    out.push_str(&format!("Snapshots for {country} ({} steps)\n", batch.len()));
    out.push_str(&format!(
        "{:>4}  {:>8}  {:>8}  {:>8}  {:>9}  {:>8}  {:>8}\n",
        "step", "food", "rent", "energy", "transport", "debt", "income"
    ));
    for (i, s) in batch.snapshots().iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:>8.0}  {:>8.0}  {:>8.0}  {:>9.0}  {:>8.0}  {:>8.0}\n",
            i, s.food, s.rent, s.energy, s.transport, s.debt, s.income
        ));
    }
    out
}

/// The preset catalog as a table.
pub fn format_catalog() -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10}  {:>6}  {:>6}  {:>6}  {:>9}  {:>6}  {:>6}\n",
        "country", "food", "rent", "energy", "transport", "debt", "income"
    ));
    for p in PRESETS {
        let v = p.profile;
        out.push_str(&format!(
            "{:<10}  {:>6.0}  {:>6.0}  {:>6.0}  {:>9.0}  {:>6.0}  {:>6.0}\n",
            p.country, v.food, v.rent, v.energy, v.transport, v.debt, v.income
        ));
    }
    out
}
