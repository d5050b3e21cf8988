//! hotswap command line
//!
//! Library half of the `hotswap` binary, split out so the pieces can be
//! tested without spawning the process.

pub mod args;
pub mod cmd;
pub mod daemon;
pub mod locks;
pub mod logging;
