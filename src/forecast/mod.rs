//! Forecast retrieval: the prediction service client and the request lifecycle
//! around it.
//!
//! - `client`: one-shot `POST /predict` call and response decoding
//! - `orchestrator`: `RequestState` machine, single in-flight request, stale-response discard

pub mod client;
pub mod orchestrator;

pub use client::{ForecastClient, HttpForecastClient, decode_response, predict_endpoint};
pub use orchestrator::{Dispatch, ForecastOrchestrator, RequestToken};
