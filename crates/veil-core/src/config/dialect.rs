//! SQL dialect selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

/// The SQL dialect a query is written in.
///
/// The dialect decides how the query is parsed and how identifiers are
/// case-folded before they are looked up in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectTag {
    #[default]
    Snowflake,
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    Generic,
}

impl DialectTag {
    pub const ALL: [DialectTag; 4] = [
        DialectTag::Snowflake,
        DialectTag::Postgres,
        DialectTag::MySql,
        DialectTag::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectTag::Snowflake => "snowflake",
            DialectTag::Postgres => "postgres",
            DialectTag::MySql => "mysql",
            DialectTag::Generic => "generic",
        }
    }
}

impl fmt::Display for DialectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(DialectTag::Snowflake),
            "postgres" | "postgresql" | "pg" => Ok(DialectTag::Postgres),
            "mysql" => Ok(DialectTag::MySql),
            "generic" => Ok(DialectTag::Generic),
            other => Err(ConfigError::Config(format!("unknown SQL dialect: {other}"))),
        }
    }
}
