//! Schema module - Configuration and selection plan types for evolutionary runs.

mod config;
mod plan;

pub use config::*;
pub use plan::*;
