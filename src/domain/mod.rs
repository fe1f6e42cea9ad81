//! Domain types used throughout the estimation pipeline.
//!
//! This module defines:
//!
//! - benchmark observations (`DataPoint`, `DataSet`)
//! - the unknowns being estimated (`ModelParams`, `ParamIndex`)
//! - model projections (`InputVars`, `OutputVars`)
//! - error bookkeeping and fit outputs (`ErrorAccumulator`, `ErrorReport`, `FitSummary`)
//! - the resolved run configuration (`FitConfig`)

pub mod defaults;
pub mod types;

pub use defaults::*;
pub use types::*;
