//! Schema catalog snapshot.
//!
//! A [`Catalog`] maps database -> tables -> columns, and every column carries a
//! sensitivity flag. It is built once by the caller before an extraction and is
//! only ever read afterwards. Table names are stored schema-qualified
//! (`SCHEMA.TABLE`) and must already be normalized the way the target dialect
//! normalizes identifiers.
//!
//! Catalogs are usually loaded from YAML:
//!
//! ```yaml
//! databases:
//!   - name: SALES
//!     tables:
//!       - name: PUBLIC.CUSTOMERS
//!         columns:
//!           - { name: ID }
//!           - { name: EMAIL, sensitive: true }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::ConfigError;

/// A single catalog column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    #[serde(default)]
    pub sensitive: bool,
}

impl ColumnSchema {
    /// A column that is not flagged sensitive.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sensitive: false,
        }
    }

    /// A column flagged sensitive.
    pub fn sensitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sensitive: true,
        }
    }
}

/// A table and its ordered column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Schema-qualified table name, e.g. `PUBLIC.ORDERS`.
    pub name: String,

    /// Columns in declaration order. This order is preserved in every result.
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }
}

/// A database and its ordered table list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub name: String,

    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Find a table by its schema-qualified key.
    pub fn table(&self, key: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == key)
    }
}

/// The full schema snapshot handed to an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub databases: Vec<DatabaseSchema>,
}

impl Catalog {
    pub fn with_database(mut self, database: DatabaseSchema) -> Self {
        self.databases.push(database);
        self
    }

    /// Load a catalog from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            databases = catalog.databases.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Look up `key` (a schema-qualified table name) in database `database`.
    ///
    /// Linear scan; the first matching database and table win, mirroring
    /// declaration order.
    pub fn find_table(&self, database: &str, key: &str) -> Option<&TableSchema> {
        self.databases
            .iter()
            .filter(|d| d.name == database)
            .find_map(|d| d.table(key))
    }

    /// Check the catalog for entries that make lookups ambiguous or impossible.
    ///
    /// `schema_qualified` says whether table names are expected to carry a
    /// schema prefix (false for dialects without a schema level).
    pub fn validate(&self, schema_qualified: bool) -> Vec<CatalogFinding> {
        let mut findings = Vec::new();
        let mut seen_databases = HashSet::new();

        for database in &self.databases {
            if database.name.is_empty() {
                findings.push(CatalogFinding::error(
                    "databases",
                    "database with an empty name",
                ));
            }
            if !seen_databases.insert(database.name.as_str()) {
                findings.push(CatalogFinding::warning(
                    database.name.clone(),
                    format!("database {} is declared more than once", database.name),
                ));
            }

            let mut seen_tables = HashSet::new();
            for table in &database.tables {
                let location = format!("{}.{}", database.name, table.name);

                if !seen_tables.insert(table.name.as_str()) {
                    findings.push(CatalogFinding::error(
                        location.clone(),
                        format!("table {} is declared more than once", table.name),
                    ));
                }

                if schema_qualified && !table.name.contains('.') {
                    findings.push(CatalogFinding::error(
                        location.clone(),
                        format!(
                            "table {} is not schema-qualified and can never be resolved",
                            table.name
                        ),
                    ));
                }

                if table.columns.is_empty() {
                    findings.push(CatalogFinding::warning(
                        location.clone(),
                        "table has no columns",
                    ));
                }

                let mut seen_columns = HashSet::new();
                for column in &table.columns {
                    if !seen_columns.insert(column.name.as_str()) {
                        findings.push(CatalogFinding::warning(
                            location.clone(),
                            format!(
                                "column {} is declared more than once; selecting it by name returns every copy",
                                column.name
                            ),
                        ));
                    }
                }
            }
        }

        findings
    }
}

/// Severity of a catalog validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingSeverity {
    Warning,
    Error,
}

impl fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSeverity::Warning => write!(f, "WARN"),
            FindingSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single catalog validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFinding {
    pub severity: FindingSeverity,
    /// Where the problem is, e.g. `SALES.PUBLIC.ORDERS`.
    pub location: String,
    pub message: String,
}

impl CatalogFinding {
    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: FindingSeverity::Error,
            location: location.into(),
            message: message.into(),
        }
    }

    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: FindingSeverity::Warning,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.location, self.message)
    }
}
