//! `latency-fit` library crate.
//!
//! The binary (`latfit`) is a thin wrapper around this library so that:
//!
//! - the estimation core is testable without spawning processes
//! - the core (model, loss, optimizer, analyzer) is reusable behind other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
