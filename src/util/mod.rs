//! Utility types and functions for pathview.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus [`Bounds`] and angle helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
