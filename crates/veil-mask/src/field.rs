//! Visible columns tracked while walking a query.

use veil_core::SensitiveField;

/// A column visible in some scope of the query, annotated with its
/// sensitivity.
///
/// The column name is fixed at creation. Only the table name may change, when
/// a table alias is applied, and sensitivity may only be raised, when a
/// natural join merges a sensitive column into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    database: String,
    table: String,
    name: String,
    sensitive: bool,
}

impl FieldInfo {
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        sensitive: bool,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            name: name.into(),
            sensitive,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub(crate) fn rename_table(&mut self, alias: &str) {
        self.table = alias.to_string();
    }

    pub(crate) fn mark_sensitive(&mut self) {
        self.sensitive = true;
    }
}

impl From<FieldInfo> for SensitiveField {
    fn from(field: FieldInfo) -> Self {
        SensitiveField {
            name: field.name,
            sensitive: field.sensitive,
        }
    }
}
