//! Compute module - Development, body extraction and the evolutionary scheduler.

mod body;
mod develop;

pub mod evolution;

pub use body::*;
pub use develop::*;
