//! Dialect-specific identifier handling.
//!
//! Everything that differs between dialects once a query is parsed lives here:
//! how unquoted identifiers are case-folded, which schema a bare table name
//! belongs to, and how many name parts a table reference may have. The
//! propagation algorithms themselves are dialect-agnostic.

use sqlparser::ast::{Ident, ObjectName};
use tracing::trace;
use veil_core::DialectTag;

use crate::error::MaskError;

/// Identifier normalization rules of one SQL dialect.
pub trait IdentifierRules {
    /// Case-fold an unquoted identifier.
    fn fold(&self, unquoted: &str) -> String;

    /// Schema used when a table reference does not name one, or `None` if the
    /// dialect has no schema level between database and table.
    fn default_schema(&self) -> Option<&'static str>;

    /// Normalize an identifier: quoted identifiers are kept verbatim, unquoted
    /// ones are case-folded.
    fn normalize(&self, ident: &Ident) -> String {
        if ident.quote_style.is_some() {
            ident.value.clone()
        } else {
            self.fold(&ident.value)
        }
    }

    /// Normalize a name written in a settings file. A value wrapped in
    /// double quotes is taken verbatim, anything else is case-folded.
    fn normalize_setting(&self, value: &str) -> String {
        match value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
        {
            Some(quoted) => quoted.to_string(),
            None => self.fold(value),
        }
    }

    /// Key two column names are compared by. Names with equal keys refer to
    /// the same column.
    fn column_key(&self, name: &str) -> String {
        name.to_string()
    }

    fn has_schemas(&self) -> bool {
        self.default_schema().is_some()
    }
}

/// Snowflake: unquoted identifiers are stored upper case.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowflakeRules;

impl IdentifierRules for SnowflakeRules {
    fn fold(&self, unquoted: &str) -> String {
        unquoted.to_uppercase()
    }

    fn default_schema(&self) -> Option<&'static str> {
        Some("PUBLIC")
    }
}

/// PostgreSQL: unquoted identifiers are stored lower case.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRules;

impl IdentifierRules for PostgresRules {
    fn fold(&self, unquoted: &str) -> String {
        unquoted.to_lowercase()
    }

    fn default_schema(&self) -> Option<&'static str> {
        Some("public")
    }
}

/// MySQL: identifiers keep their case and databases double as schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRules;

impl IdentifierRules for MySqlRules {
    fn fold(&self, unquoted: &str) -> String {
        unquoted.to_string()
    }

    fn default_schema(&self) -> Option<&'static str> {
        None
    }

    // Column names are case-insensitive even though table names are not.
    fn column_key(&self, name: &str) -> String {
        name.to_lowercase()
    }
}

/// ANSI behaviour: unquoted identifiers fold to upper case.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRules;

impl IdentifierRules for GenericRules {
    fn fold(&self, unquoted: &str) -> String {
        unquoted.to_uppercase()
    }

    fn default_schema(&self) -> Option<&'static str> {
        Some("PUBLIC")
    }
}

/// Whether catalog table names carry a schema prefix in `dialect`.
pub fn has_schemas(dialect: DialectTag) -> bool {
    match dialect {
        DialectTag::Snowflake => SnowflakeRules.has_schemas(),
        DialectTag::Postgres => PostgresRules.has_schemas(),
        DialectTag::MySql => MySqlRules.has_schemas(),
        DialectTag::Generic => GenericRules.has_schemas(),
    }
}

/// A fully resolved table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub database: String,
    /// `None` for dialects without a schema level.
    pub schema: Option<String>,
    pub table: String,
}

impl QualifiedName {
    /// The key the table is stored under in its catalog database.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }
}

/// Resolve a possibly qualified object name to `(database, schema, table)`.
///
/// Missing parts fall back to `current_database` and `default_schema`, as do
/// parts that normalize to an empty string.
pub fn resolve_object_name<R: IdentifierRules + ?Sized>(
    rules: &R,
    name: &ObjectName,
    current_database: &str,
    default_schema: Option<&str>,
) -> Result<QualifiedName, MaskError> {
    let lookup_error = || {
        MaskError::schema_lookup(
            current_database,
            default_schema.unwrap_or_default(),
            name.to_string(),
        )
    };

    let mut parts = Vec::with_capacity(name.0.len());
    for part in &name.0 {
        match part.as_ident() {
            Some(ident) => parts.push(rules.normalize(ident)),
            None => return Err(lookup_error()),
        }
    }

    let or_default = |part: &str, fallback: &str| {
        if part.is_empty() {
            fallback.to_string()
        } else {
            part.to_string()
        }
    };

    let Some((table, qualifiers)) = parts.split_last() else {
        return Err(lookup_error());
    };

    let (database, schema) = match (default_schema, qualifiers) {
        (Some(default_schema), []) => (
            current_database.to_string(),
            Some(default_schema.to_string()),
        ),
        (Some(default_schema), [schema]) => (
            current_database.to_string(),
            Some(or_default(schema, default_schema)),
        ),
        (Some(default_schema), [database, schema]) => (
            or_default(database, current_database),
            Some(or_default(schema, default_schema)),
        ),
        (None, []) => (current_database.to_string(), None),
        (None, [database]) => (or_default(database, current_database), None),
        _ => return Err(lookup_error()),
    };

    let resolved = QualifiedName {
        database,
        schema,
        table: table.clone(),
    };

    trace!(name = %name, key = %resolved.key(), database = %resolved.database, "resolved object name");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::ObjectNamePart;

    fn object_name(parts: &[Ident]) -> ObjectName {
        ObjectName(
            parts
                .iter()
                .cloned()
                .map(ObjectNamePart::Identifier)
                .collect(),
        )
    }

    #[test]
    fn test_snowflake_folds_unquoted_to_upper() {
        let rules = SnowflakeRules;
        assert_eq!(rules.normalize(&Ident::new("orders")), "ORDERS");
        assert_eq!(rules.normalize(&Ident::with_quote('"', "orders")), "orders");
    }

    #[test]
    fn test_postgres_folds_unquoted_to_lower() {
        let rules = PostgresRules;
        assert_eq!(rules.normalize(&Ident::new("Orders")), "orders");
        assert_eq!(rules.normalize(&Ident::with_quote('"', "Orders")), "Orders");
    }

    #[test]
    fn test_mysql_keeps_case() {
        assert_eq!(MySqlRules.normalize(&Ident::new("Orders")), "Orders");
        assert!(!MySqlRules.has_schemas());
    }

    #[test]
    fn test_mysql_column_keys_ignore_case() {
        assert_eq!(MySqlRules.column_key("CARD"), MySqlRules.column_key("card"));
        assert_ne!(SnowflakeRules.column_key("lower"), SnowflakeRules.column_key("LOWER"));
    }

    #[test]
    fn test_settings_are_folded_unless_quoted() {
        assert_eq!(SnowflakeRules.normalize_setting("sales"), "SALES");
        assert_eq!(SnowflakeRules.normalize_setting("\"Sales\""), "Sales");
        assert_eq!(PostgresRules.normalize_setting("Reporting"), "reporting");
    }

    #[test]
    fn test_has_schemas_per_dialect() {
        assert!(has_schemas(DialectTag::Snowflake));
        assert!(has_schemas(DialectTag::Postgres));
        assert!(has_schemas(DialectTag::Generic));
        assert!(!has_schemas(DialectTag::MySql));
    }

    #[test]
    fn test_bare_table_uses_session_defaults() {
        let name = object_name(&[Ident::new("t")]);
        let resolved = resolve_object_name(&SnowflakeRules, &name, "DB", Some("PUBLIC")).unwrap();
        assert_eq!(
            resolved,
            QualifiedName {
                database: "DB".to_string(),
                schema: Some("PUBLIC".to_string()),
                table: "T".to_string(),
            }
        );
        assert_eq!(resolved.key(), "PUBLIC.T");
    }

    #[test]
    fn test_fully_qualified_table() {
        let name = object_name(&[Ident::new("other"), Ident::new("sales"), Ident::new("t")]);
        let resolved = resolve_object_name(&SnowflakeRules, &name, "DB", Some("PUBLIC")).unwrap();
        assert_eq!(resolved.database, "OTHER");
        assert_eq!(resolved.key(), "SALES.T");
    }

    #[test]
    fn test_empty_part_falls_back_to_default() {
        let name = object_name(&[Ident::with_quote('"', ""), Ident::new("t")]);
        let resolved = resolve_object_name(&SnowflakeRules, &name, "DB", Some("PUBLIC")).unwrap();
        assert_eq!(resolved.key(), "PUBLIC.T");
    }

    #[test]
    fn test_mysql_two_part_name_is_database_table() {
        let name = object_name(&[Ident::new("shop"), Ident::new("orders")]);
        let resolved = resolve_object_name(&MySqlRules, &name, "default_db", None).unwrap();
        assert_eq!(resolved.database, "shop");
        assert_eq!(resolved.key(), "orders");
    }

    #[test]
    fn test_too_many_parts_is_lookup_error() {
        let name = object_name(&[Ident::new("a"), Ident::new("b"), Ident::new("c")]);
        let err = resolve_object_name(&MySqlRules, &name, "db", None).unwrap_err();
        assert!(matches!(err, MaskError::SchemaLookup { .. }));
    }
}
