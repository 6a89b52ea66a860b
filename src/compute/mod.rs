//! Compute module - Structural analysis and the genetic search.

mod dsm;
mod evaluator;

pub mod evolution;

pub use dsm::*;
pub use evaluator::*;
