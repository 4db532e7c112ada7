//! CLI command implementations for veil.

pub mod check;
pub mod extract;
