//! Configuration types for veil.
//!
//! An extraction is driven by two inputs besides the SQL text: the schema
//! [`Catalog`](crate::Catalog) and an [`ExtractionConfig`] holding the session
//! defaults (dialect, current database, default schema) and the policy for SQL
//! constructs the walker does not understand. Both load from YAML.

pub mod dialect;
pub mod extraction;

use thiserror::Error;

pub use dialect::DialectTag;
pub use extraction::{ExtractionConfig, UnsupportedPolicy};

/// Errors raised while loading configuration or catalog files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
