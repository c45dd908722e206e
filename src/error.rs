//! Error types.
//!
//! - `ForecastError`: the pipeline taxonomy. Cloneable so a failure can be held
//!   inside `RequestState` and shown by the presentation layer.
//! - `AppError`: process-level failure carrying the exit code for `main`.

use thiserror::Error;

/// Failures produced by the forecast pipeline.
///
/// The `Display` output is the human-readable message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// The requested country is not a key of the preset catalog.
    #[error("Unknown country '{0}'.")]
    UnknownCountry(String),
    /// Connectivity failure, timeout, or a non-success status without a detail message.
    #[error("{0}")]
    Transport(String),
    /// Non-success status with a server-supplied detail (shown verbatim).
    #[error("{detail}")]
    Server { status: u16, detail: String },
    /// Response body did not match the expected shape or length.
    #[error("Malformed forecast response: {0}")]
    MalformedResponse(String),
}

impl ForecastError {
    /// Short, stable name of the error kind (used in logs and exports).
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::UnknownCountry(_) => "unknown_country",
            ForecastError::Transport(_) => "transport_error",
            ForecastError::Server { .. } => "server_error",
            ForecastError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        let exit_code = match err {
            ForecastError::UnknownCountry(_) => 2,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
