//! Export a reconciled timeline to JSON or CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::TimelineSeries;
use crate::error::AppError;

/// JSON export document.
#[derive(Debug, Serialize)]
pub struct TimelineExport<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub country: &'a str,
    pub year: u16,
    pub labels: &'a [String],
    pub actual: &'a [f64],
    pub forecast: Option<&'a [f64]>,
}

/// Write the timeline as a JSON document.
pub fn write_timeline_json(
    path: &Path,
    series: &TimelineSeries,
    country: &str,
    year: u16,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let doc = TimelineExport {
        tool: "spi",
        generated_at: Utc::now(),
        country,
        year,
        labels: &series.labels,
        actual: &series.actual,
        forecast: series.forecast.as_deref(),
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;

    Ok(())
}

/// Write the timeline as CSV (`label,actual,forecast`), leaving absent cells empty.
pub fn write_timeline_csv(path: &Path, series: &TimelineSeries) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "label,actual,forecast")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let forecast = series.forecast.as_deref().unwrap_or(&[]);
    for (i, label) in series.labels.iter().enumerate() {
        let actual = series.actual.get(i).map(|v| format!("{v:.4}")).unwrap_or_default();
        let predicted = i
            .checked_sub(series.actual.len())
            .and_then(|j| forecast.get(j))
            .map(|v| format!("{v:.4}"))
            .unwrap_or_default();
        writeln!(file, "{label},{actual},{predicted}")
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
