//! Error types for sensitivity extraction.

use thiserror::Error;

/// Errors that can occur while extracting sensitive fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    Parse(String),

    /// A referenced table is absent from the catalog.
    #[error("table {} not found in database {database}", qualified_table(.schema, .table))]
    SchemaLookup {
        database: String,
        schema: String,
        table: String,
    },

    /// The query uses a construct that cannot be analyzed and the
    /// extraction is configured to fail closed.
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String },

    /// A nested failure annotated with where in the query it happened.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<MaskError>,
    },
}

impl MaskError {
    pub(crate) fn schema_lookup(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        MaskError::SchemaLookup {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Wrap this error with a description of where it happened.
    pub fn context(self, context: impl Into<String>) -> Self {
        MaskError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer removed.
    pub fn root(&self) -> &MaskError {
        let mut current = self;
        while let MaskError::Context { source, .. } = current {
            current = source;
        }
        current
    }
}

fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

/// Attach context to the error of a `Result`, lazily.
pub(crate) trait ResultExt<T> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T, MaskError>;
}

impl<T> ResultExt<T> for Result<T, MaskError> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T, MaskError> {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_every_context_layer() {
        let err = MaskError::schema_lookup("DB", "PUBLIC", "T")
            .context("failed to extract sensitive fields of the right part of the JOIN near line 1")
            .context("failed to extract sensitive fields of the #1 join clause near line 1");

        assert_eq!(err.root(), &MaskError::schema_lookup("DB", "PUBLIC", "T"));
        assert!(err.to_string().contains("#1 join clause"));
        assert!(err.to_string().ends_with("table PUBLIC.T not found in database DB"));
    }
}
