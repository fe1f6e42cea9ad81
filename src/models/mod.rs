//! Analytic performance models.
//!
//! Models are pure functions of `(InputVars, ModelParams)` so that the loss and
//! search code can stay generic over them.

pub mod model;

pub use model::*;
