//! Data sources that do not come from benchmark files.

pub mod sample;

pub use sample::*;
