//! SQL parsing.

use sqlparser::ast::Statement;
use sqlparser::dialect::{GenericDialect, MySqlDialect, PostgreSqlDialect, SnowflakeDialect};
use sqlparser::parser::Parser;
use veil_core::DialectTag;

use crate::error::MaskError;

/// Parses SQL text in one dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlAnalyzer {
    dialect: DialectTag,
}

impl SqlAnalyzer {
    /// Create a new SQL analyzer for `dialect`.
    pub fn new(dialect: DialectTag) -> Self {
        Self { dialect }
    }

    /// Parse a SQL string into statements.
    ///
    /// Blank input (or input made only of `;`) parses to no statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, MaskError> {
        let parsed = match self.dialect {
            DialectTag::Snowflake => Parser::parse_sql(&SnowflakeDialect {}, sql),
            DialectTag::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
            DialectTag::MySql => Parser::parse_sql(&MySqlDialect {}, sql),
            DialectTag::Generic => Parser::parse_sql(&GenericDialect {}, sql),
        };
        parsed.map_err(|e| MaskError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_select() {
        for dialect in DialectTag::ALL {
            let stmts = SqlAnalyzer::new(dialect).parse("SELECT * FROM users").unwrap();
            assert_eq!(stmts.len(), 1);
            assert!(matches!(stmts[0], Statement::Query(_)));
        }
    }

    #[test]
    fn test_parse_blank_input() {
        let analyzer = SqlAnalyzer::default();
        assert!(analyzer.parse("").unwrap().is_empty());
        assert!(analyzer.parse("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error() {
        let err = SqlAnalyzer::default().parse("SELEC * FORM t").unwrap_err();
        assert!(matches!(err, MaskError::Parse(_)));
    }

    #[test]
    fn test_parse_multiple_statements() {
        let stmts = SqlAnalyzer::default()
            .parse("SELECT a FROM t; SELECT b FROM u;")
            .unwrap();
        assert_eq!(stmts.len(), 2);
    }
}
