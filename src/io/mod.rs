//! Input/output helpers.
//!
//! - benchmark readers and format detection (`readers`)
//! - file / URL byte sources (`source`)
//! - result exports (JSON/CSV) (`export`)

pub mod export;
pub mod readers;
pub mod source;

pub use export::*;
pub use readers::*;
pub use source::*;
