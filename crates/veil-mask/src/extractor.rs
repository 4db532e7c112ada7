//! Top-level sensitive field extraction.

use sqlparser::ast::Statement;
use tracing::debug;
use veil_core::{Catalog, DialectTag, ExtractionConfig, SensitiveField};

use crate::collector::FieldCollector;
use crate::dialect::{GenericRules, IdentifierRules, MySqlRules, PostgresRules, SnowflakeRules};
use crate::error::MaskError;
use crate::parser::SqlAnalyzer;
use crate::walker::{SensitivityWalker, SqlWalker};

/// Extracts the sensitivity of every column a query returns.
///
/// The catalog is borrowed for the extractor's lifetime and never modified.
/// Each call to [`extract`](Extractor::extract) walks with fresh scope state,
/// so one extractor may serve many queries.
pub struct Extractor<'c> {
    catalog: &'c Catalog,
    config: ExtractionConfig,
    analyzer: SqlAnalyzer,
}

impl<'c> Extractor<'c> {
    pub fn new(catalog: &'c Catalog, config: ExtractionConfig) -> Self {
        Self {
            catalog,
            analyzer: SqlAnalyzer::new(config.dialect),
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Parse `sql` and return the sensitivity of each output column, in
    /// select-list order after wildcard expansion.
    ///
    /// Every query statement contributes its columns in script order; other
    /// statements contribute nothing. On error no fields are returned.
    pub fn extract(&self, sql: &str) -> Result<Vec<SensitiveField>, MaskError> {
        let statements = self.analyzer.parse(sql)?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        match self.config.dialect {
            DialectTag::Snowflake => self.walk(SnowflakeRules, &statements),
            DialectTag::Postgres => self.walk(PostgresRules, &statements),
            DialectTag::MySql => self.walk(MySqlRules, &statements),
            DialectTag::Generic => self.walk(GenericRules, &statements),
        }
    }

    fn walk<R: IdentifierRules>(
        &self,
        rules: R,
        statements: &[Statement],
    ) -> Result<Vec<SensitiveField>, MaskError> {
        let mut walker = SqlWalker::new(self.catalog, rules, &self.config);
        let mut collector = FieldCollector::new();

        for statement in statements {
            match statement {
                Statement::Query(query) => collector.collect(|| walker.analyze_query(query)),
                other => debug!(statement = %other, "skipping non-query statement"),
            }
            if collector.has_failed() {
                break;
            }
        }

        collector.finish()
    }
}

/// Extract the sensitive fields of `sql` against `catalog`.
pub fn extract_sensitive_fields(
    sql: &str,
    catalog: &Catalog,
    config: &ExtractionConfig,
) -> Result<Vec<SensitiveField>, MaskError> {
    Extractor::new(catalog, config.clone()).extract(sql)
}
