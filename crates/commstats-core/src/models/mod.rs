//! Data models for commstats.
//!
//! Query shapes for the remote collection store and the statistics handed to
//! the dashboard frontend.

mod query;
mod stats;

pub use query::*;
pub use stats::*;
