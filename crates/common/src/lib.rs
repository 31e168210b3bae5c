//! Shared helpers for the tracker crates.
//!
//! - `utils::formatters` / `utils::validators`: pure display and field-rule helpers.
//! - `utils::logging`: tracing subscriber setup shared by binaries.
//! - `env`: startup sanity checks.

pub mod env;
pub mod utils;
