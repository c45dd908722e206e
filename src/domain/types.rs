//! Shared domain types.
//!
//! The economic and forecast types serialize to exactly the JSON shapes the
//! prediction service speaks, so the HTTP client can send and decode them
//! without intermediate DTOs.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Number of synthetic steps sent with every forecast request.
pub const FORECAST_HORIZON: usize = 6;

/// Fixed historical SPI series shown before the forecast.
pub const ACTUAL_SPI: [f64; 6] = [45.0, 46.0, 47.0, 48.0, 49.0, 50.0];

/// Years offered by the year selector.
pub const YEAR_OPTIONS: [u16; 6] = [2020, 2021, 2022, 2023, 2024, 2025];

pub const DEFAULT_YEAR: u16 = 2024;
pub const DEFAULT_COUNTRY: &str = "Finland";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Monthly cost/income figures for one household profile (currency/month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomicProfile {
    pub food: f64,
    pub rent: f64,
    pub energy: f64,
    pub transport: f64,
    pub debt: f64,
    pub income: f64,
}

/// One time step of a batch; its position in the batch is its step index.
pub type Snapshot = EconomicProfile;

/// Ordered synthetic snapshots, serialized as the `/predict` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotBatch {
    snapshots: Vec<Snapshot>,
}

impl SnapshotBatch {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self { snapshots }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

/// Predicted SPI values, one per snapshot of the batch that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    predicted_spi: Vec<f64>,
}

impl ForecastResult {
    pub fn new(predicted_spi: Vec<f64>) -> Self {
        Self { predicted_spi }
    }

    pub fn values(&self) -> &[f64] {
        &self.predicted_spi
    }

    pub fn len(&self) -> usize {
        self.predicted_spi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted_spi.is_empty()
    }
}

/// Lifecycle of the current forecast request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Succeeded(ForecastResult),
    Failed(ForecastError),
}

impl RequestState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::InFlight)
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ForecastError> {
        match self {
            RequestState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::InFlight => "in-flight",
            RequestState::Succeeded(_) => "succeeded",
            RequestState::Failed(_) => "failed",
        }
    }
}

/// Reconciled timeline consumed by renderers.
///
/// Labels `1..=actual.len()` belong to the actual series. When a forecast is
/// present it occupies the labels that follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSeries {
    pub labels: Vec<String>,
    pub actual: Vec<f64>,
    pub forecast: Option<Vec<f64>>,
}

impl TimelineSeries {
    /// Actual values as `(step, value)` pairs, steps starting at 1.
    pub fn actual_points(&self) -> Vec<(f64, f64)> {
        self.actual
            .iter()
            .enumerate()
            .map(|(i, &y)| ((i + 1) as f64, y))
            .collect()
    }

    /// Forecast values as `(step, value)` pairs, continuing after the actual series.
    pub fn forecast_points(&self) -> Vec<(f64, f64)> {
        let offset = self.actual.len();
        self.forecast
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, &y)| ((offset + i + 1) as f64, y))
            .collect()
    }

    /// Last step on the label axis.
    pub fn last_step(&self) -> usize {
        self.labels.len()
    }
}

/// How the synthesizer treats debt that would fall below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DebtPolicy {
    /// Emit the arithmetic result unchanged, negative or not.
    #[default]
    PassThrough,
    /// Floor debt at zero.
    Clamp,
}

/// A run's configuration as understood by the pipeline.
///
/// Derived from CLI flags, falling back to the environment (`.env`).
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Base URL of the prediction service; `/predict` is appended.
    pub api_url: String,
    pub timeout: Duration,
    pub debt_policy: DebtPolicy,
}
