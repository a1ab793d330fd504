//! Presentation pipeline: filter parameters in, stats and rows out.
//!
//! Everything here is synchronous and side-effect free apart from the
//! shared `FilterState` handle.

pub mod filters;
pub mod render;
pub mod stats;
