//! CLI command implementations

pub mod clean;
pub mod start;
pub mod stop;
