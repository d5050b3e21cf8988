//! Common utilities for supervisor tests

pub mod engine;

pub use engine::{Call, MockEngine};
