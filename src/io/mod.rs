//! Input/output helpers.
//!
//! - timeline exports (JSON/CSV) (`export`)

pub mod export;

pub use export::*;
