//! Per-extraction session settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{ConfigError, DialectTag};

/// What to do when a query uses a construct the walker cannot analyze
/// (subqueries, CTEs, table functions, `VALUES`, flatten/lateral sources).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// The construct contributes no fields and no error.
    #[default]
    Degrade,
    /// The extraction fails with an unsupported-construct error.
    FailClosed,
}

/// Session defaults for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Dialect used to parse the query and normalize identifiers.
    #[serde(default)]
    pub dialect: DialectTag,

    /// Database used for table references that do not name one.
    #[serde(default)]
    pub current_database: String,

    /// Overrides the dialect's default schema (e.g. `PUBLIC`) for table
    /// references that do not name one.
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Handling of unsupported constructs.
    #[serde(default)]
    pub unsupported: UnsupportedPolicy,
}

impl ExtractionConfig {
    pub fn new(current_database: impl Into<String>) -> Self {
        Self {
            current_database: current_database.into(),
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: DialectTag) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_unsupported(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    /// Load settings from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::from_yaml("{}").unwrap();
        assert_eq!(config.dialect, DialectTag::Snowflake);
        assert_eq!(config.current_database, "");
        assert_eq!(config.default_schema, None);
        assert_eq!(config.unsupported, UnsupportedPolicy::Degrade);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
dialect: postgres
current_database: shop
default_schema: sales
unsupported: fail_closed
"#;
        let config = ExtractionConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config,
            ExtractionConfig::new("shop")
                .with_dialect(DialectTag::Postgres)
                .with_default_schema("sales")
                .with_unsupported(UnsupportedPolicy::FailClosed)
        );
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        assert!(ExtractionConfig::from_yaml("dialect: oracle").is_err());
    }
}
