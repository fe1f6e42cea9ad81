//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - score candidate parameters against observations (`loss`)
//! - search the parameter space through an injected `Minimizer`
//! - report residuals for fixed parameters (`analyzer`)
//! - compute a least-squares starting point (`warm_start`)

pub mod analyzer;
pub mod loss;
pub mod minimizer;
pub mod optimizer;
pub mod warm_start;

pub use analyzer::*;
pub use loss::*;
pub use minimizer::*;
pub use optimizer::*;
pub use warm_start::*;
