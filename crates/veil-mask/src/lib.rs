//! # veil-mask
//!
//! Column-level sensitivity propagation over parsed SQL.
//!
//! Given a query and a schema [`Catalog`](veil_core::Catalog) in which every
//! column is flagged sensitive or not, this crate works out which of the
//! columns the query returns are sensitive.
//!
//! ## How It Works
//!
//! ```sql
//! SELECT * FROM customers NATURAL JOIN accounts
//! ```
//!
//! 1. The FROM clause is resolved first. Each table reference becomes the
//!    catalog's column list for that table (renamed by its alias, if any).
//! 2. Join chains fold left to right. Natural joins collapse same-named
//!    columns into the left one, which becomes sensitive if either side was.
//!    Every other join, and comma-separated sources, keep both sides.
//! 3. The select list is evaluated against the resulting scope: `*` returns
//!    the whole scope, a bare column name returns every visible column with
//!    that name.
//!
//! ## Propagation Rules
//!
//! | Construct             | Output columns                                   |
//! |-----------------------|--------------------------------------------------|
//! | `FROM a, b`           | `a` then `b`                                     |
//! | `a JOIN b ON ...`     | `a` then `b`                                     |
//! | `a NATURAL JOIN b`    | `a`, then `b`'s columns not in `a`; OR-ed flags  |
//! | `a AS x`              | `a`, table renamed to `x`                        |
//! | subquery, CTE, VALUES | nothing, or an error when failing closed         |

pub mod collector;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod field;
pub mod parser;
pub mod propagate;
pub mod scope;
pub mod walker;

pub use collector::FieldCollector;
pub use dialect::{
    GenericRules, IdentifierRules, MySqlRules, PostgresRules, QualifiedName, SnowflakeRules,
};
pub use error::MaskError;
pub use extractor::{Extractor, extract_sensitive_fields};
pub use field::FieldInfo;
pub use parser::SqlAnalyzer;
pub use propagate::{JoinKind, ProjectionItem};
pub use scope::{ScopeGuard, ScopeStack};
pub use walker::{SensitivityWalker, SqlWalker, UnsupportedConstruct};
