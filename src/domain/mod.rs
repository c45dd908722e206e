//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - economic inputs (`EconomicProfile`, `SnapshotBatch`)
//! - forecast outputs and request lifecycle (`ForecastResult`, `RequestState`)
//! - the reconciled chart input (`TimelineSeries`)
//! - run configuration (`ForecastConfig`, `DebtPolicy`)

pub mod types;

pub use types::*;
