//! Reporting utilities: timeline reconciliation and formatted terminal output.

use crate::domain::{RequestState, TimelineSeries};

pub mod format;

pub use format::*;

/// Merge the actual series with the forecast held by `state`.
///
/// The actual series keeps labels `1..=actual.len()`. Only a `Succeeded`
/// state contributes a forecast; it takes the labels that follow. Any other
/// state yields no forecast at all (never a zero-filled one).
pub fn reconcile(actual: &[f64], state: &RequestState) -> TimelineSeries {
    let forecast = state.forecast().map(|r| r.values().to_vec());
    let n = actual.len() + forecast.as_ref().map_or(0, Vec::len);

    TimelineSeries {
        labels: (1..=n).map(|i| i.to_string()).collect(),
        actual: actual.to_vec(),
        forecast,
    }
}
