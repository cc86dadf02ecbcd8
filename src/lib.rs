//! Steamwatch — a best-effort Steam download tracker.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod apps;
pub mod artifact;
pub mod counter;
pub mod engine;
pub mod extract;
pub mod locator;
pub mod model;
pub mod rate;
