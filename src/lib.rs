//! `spi-forecast` library crate.
//!
//! The binary (`spi`) is a thin wrapper around this library so that:
//!
//! - the forecast pipeline is testable without spawning processes
//! - the pipeline is reusable by other front-ends
//! - presentation (CLI tables, TUI) stays separate from the request lifecycle

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
