//! Schema module - Configuration, chromosome and boundary-condition types.

pub mod array;
mod boundary;
mod config;
mod material;
mod progress;
mod truss;

pub use boundary::*;
pub use config::*;
pub use material::*;
pub use progress::*;
pub use truss::*;
