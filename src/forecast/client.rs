//! Prediction service integration (`POST {base}/predict`).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{ForecastConfig, ForecastResult, SnapshotBatch};
use crate::error::{AppError, ForecastError};

const PREDICT_PATH: &str = "/predict";

/// Anything that can turn a snapshot batch into SPI predictions.
///
/// Implementations make exactly one attempt per call: no retries, no caching.
pub trait ForecastClient: Send + Sync {
    fn predict(&self, batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError>;
}

/// Blocking HTTP client for the prediction service.
pub struct HttpForecastClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpForecastClient {
    pub fn new(config: &ForecastConfig) -> Result<Self, AppError> {
        let base = config.api_url.trim();
        if base.is_empty() {
            return Err(AppError::new(2, "Prediction service URL is empty."));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: predict_endpoint(base),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> ForecastError {
        if err.is_timeout() {
            ForecastError::Transport(format!(
                "Forecast request timed out after {}s.",
                self.timeout.as_secs_f64()
            ))
        } else {
            ForecastError::Transport(format!("Forecast request failed: {err}"))
        }
    }
}

impl ForecastClient for HttpForecastClient {
    fn predict(&self, batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError> {
        debug!(endpoint = %self.endpoint, snapshots = batch.len(), "posting forecast request");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| self.transport_error(e))?;

        debug!(status, bytes = body.len(), "forecast response received");
        decode_response(status, &body, batch.len())
    }
}

/// Join the configured base URL and the predict path.
pub fn predict_endpoint(base_url: &str) -> String {
    format!("{}{PREDICT_PATH}", base_url.trim().trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predicted_spi: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Decode a prediction response.
///
/// - 2xx: body must be `{"predicted_spi": [number; expected_len]}`
/// - otherwise: `{"detail": ...}` becomes a server error; anything else is a
///   transport error naming the status
pub fn decode_response(
    status: u16,
    body: &str,
    expected_len: usize,
) -> Result<ForecastResult, ForecastError> {
    if !(200..300).contains(&status) {
        return Err(decode_error_body(status, body));
    }

    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| ForecastError::MalformedResponse(format!("{e}")))?;

    if parsed.predicted_spi.len() != expected_len {
        return Err(ForecastError::MalformedResponse(format!(
            "expected {expected_len} predictions, got {}",
            parsed.predicted_spi.len()
        )));
    }

    Ok(ForecastResult::new(parsed.predicted_spi))
}

fn decode_error_body(status: u16, body: &str) -> ForecastError {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.detail)
        .and_then(|d| match d {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s),
            // e.g. validation errors reported as a list of objects
            other => Some(other.to_string()),
        });

    match detail {
        Some(detail) => ForecastError::Server { status, detail },
        None => ForecastError::Transport(format!(
            "Forecast service responded with HTTP {status}."
        )),
    }
}
