use serde::{Deserialize, Serialize};

// Schema catalog snapshot consumed by every extraction
pub mod catalog;
// Configuration types shared by the library and the CLI
pub mod config;

pub use catalog::{
    Catalog, CatalogFinding, ColumnSchema, DatabaseSchema, FindingSeverity, TableSchema,
};
pub use config::{ConfigError, DialectTag, ExtractionConfig, UnsupportedPolicy};

/// One column returned by a query, annotated with its sensitivity.
///
/// This is the externally visible result of an extraction. A list of these is
/// positionally aligned with the query's select list after wildcard expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveField {
    pub name: String,
    pub sensitive: bool,
}

impl SensitiveField {
    pub fn new(name: impl Into<String>, sensitive: bool) -> Self {
        Self {
            name: name.into(),
            sensitive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_field_serializes_as_flat_object() {
        let field = SensitiveField::new("EMAIL", true);
        let json = serde_json::to_value(&field).expect("field must serialize");
        assert_eq!(json, serde_json::json!({ "name": "EMAIL", "sensitive": true }));
    }
}
