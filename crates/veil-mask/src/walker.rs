//! Query walking.
//!
//! [`SensitivityWalker`] is the set of capabilities a dialect needs to turn a
//! parsed query into the fields it returns. [`SqlWalker`] implements it over
//! the `sqlparser` AST for every dialect; the dialect only enters through its
//! [`IdentifierRules`]. The walk evaluates FROM before the select list and
//! recurses bottom-up through join chains, handing the actual field algebra to
//! [`crate::propagate`].

use std::fmt;

use sqlparser::ast::{
    ExcludeSelectItem, Expr, Join, JoinConstraint, JoinOperator, ObjectName, Query, Select,
    SelectItem, SetExpr, Spanned, TableAlias, TableFactor, TableWithJoins,
    WildcardAdditionalOptions,
};
use tracing::{debug, warn};
use veil_core::{Catalog, ExtractionConfig, UnsupportedPolicy};

use crate::dialect::{IdentifierRules, resolve_object_name};
use crate::error::{MaskError, ResultExt};
use crate::field::FieldInfo;
use crate::propagate::{self, JoinKind, ProjectionItem};
use crate::scope::ScopeStack;

/// SQL constructs whose output columns are not analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedConstruct {
    /// `VALUES (...)` row constructors.
    Values,
    /// Table-valued function calls, e.g. `TABLE(my_udtf())`.
    TableFunction,
    /// Derived tables, i.e. subqueries in FROM.
    Subquery,
    /// `FLATTEN(...)` / `UNNEST(...)`.
    Flatten,
    /// `LATERAL` sources.
    Lateral,
    /// `WITH` common table expressions.
    Cte,
    /// `UNION`, `INTERSECT`, `EXCEPT`.
    SetOperation,
    Other,
}

impl fmt::Display for UnsupportedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsupportedConstruct::Values => "values",
            UnsupportedConstruct::TableFunction => "table_function",
            UnsupportedConstruct::Subquery => "subquery",
            UnsupportedConstruct::Flatten => "flatten",
            UnsupportedConstruct::Lateral => "lateral",
            UnsupportedConstruct::Cte => "cte",
            UnsupportedConstruct::SetOperation => "set_operation",
            UnsupportedConstruct::Other => "other",
        };
        f.write_str(name)
    }
}

/// Grammar-level analysis steps, one per node kind that affects the visible
/// columns.
pub trait SensitivityWalker {
    /// Fields returned by a (possibly nested) query.
    fn analyze_query(&mut self, query: &Query) -> Result<Vec<FieldInfo>, MaskError>;

    /// Fields returned by one `SELECT`, evaluated in the scope its FROM opens.
    fn analyze_select(&mut self, select: &Select) -> Result<Vec<FieldInfo>, MaskError>;

    /// Fields visible from a FROM clause.
    fn analyze_from(&mut self, from: &[TableWithJoins]) -> Result<Vec<FieldInfo>, MaskError>;

    /// Fields of one table source and its join chain.
    fn analyze_table_source(
        &mut self,
        source: &TableWithJoins,
    ) -> Result<Vec<FieldInfo>, MaskError>;

    /// Fields after joining `join` onto the accumulated `left` side.
    fn analyze_join(
        &mut self,
        left: Vec<FieldInfo>,
        join: &Join,
    ) -> Result<Vec<FieldInfo>, MaskError>;

    /// Fields of a single table reference, alias applied.
    fn analyze_object_ref(&mut self, relation: &TableFactor) -> Result<Vec<FieldInfo>, MaskError>;
}

/// Walker for one extraction. Owns the scope stack; borrows the catalog.
pub struct SqlWalker<'c, R> {
    catalog: &'c Catalog,
    rules: R,
    current_database: String,
    default_schema: Option<String>,
    unsupported: UnsupportedPolicy,
    scopes: ScopeStack,
}

impl<'c, R: IdentifierRules> SqlWalker<'c, R> {
    pub fn new(catalog: &'c Catalog, rules: R, config: &ExtractionConfig) -> Self {
        let default_schema = if rules.has_schemas() {
            config
                .default_schema
                .as_deref()
                .map(|schema| rules.normalize_setting(schema))
                .or_else(|| rules.default_schema().map(str::to_string))
        } else {
            None
        };

        Self {
            catalog,
            rules,
            current_database: config.current_database.clone(),
            default_schema,
            unsupported: config.unsupported,
            scopes: ScopeStack::new(),
        }
    }

    /// Current scope depth; 1 when no query is being evaluated.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    fn unsupported(&self, construct: UnsupportedConstruct) -> Result<Vec<FieldInfo>, MaskError> {
        match self.unsupported {
            UnsupportedPolicy::Degrade => {
                warn!(%construct, "unsupported construct contributes no fields");
                Ok(Vec::new())
            }
            UnsupportedPolicy::FailClosed => Err(MaskError::Unsupported {
                construct: construct.to_string(),
            }),
        }
    }

    fn projection_item(&self, item: &SelectItem) -> ProjectionItem {
        match item {
            SelectItem::Wildcard(options) => ProjectionItem::Wildcard {
                exclude: self.excluded_columns(options),
            },
            // `t.*` expands to the whole scope, not just `t`'s columns.
            SelectItem::QualifiedWildcard(_, options) => ProjectionItem::Wildcard {
                exclude: self.excluded_columns(options),
            },
            SelectItem::UnnamedExpr(Expr::Identifier(ident))
            | SelectItem::ExprWithAlias {
                expr: Expr::Identifier(ident),
                ..
            } => ProjectionItem::Column(self.rules.normalize(ident)),
            _ => ProjectionItem::Unsupported,
        }
    }

    /// Columns removed from a wildcard by `EXCLUDE` or `EXCEPT`. `RENAME` and
    /// `REPLACE` keep the column in place, so they do not change the result.
    fn excluded_columns(&self, options: &WildcardAdditionalOptions) -> Vec<String> {
        let mut excluded = Vec::new();
        match &options.opt_exclude {
            Some(ExcludeSelectItem::Single(ident)) => excluded.push(self.rules.normalize(ident)),
            Some(ExcludeSelectItem::Multiple(idents)) => {
                excluded.extend(idents.iter().map(|ident| self.rules.normalize(ident)));
            }
            None => {}
        }
        if let Some(except) = &options.opt_except {
            excluded.push(self.rules.normalize(&except.first_element));
            excluded.extend(
                except
                    .additional_elements
                    .iter()
                    .map(|ident| self.rules.normalize(ident)),
            );
        }
        excluded
    }

    /// Look a base table up in the catalog and emit one field per column.
    fn resolve_table(&self, name: &ObjectName) -> Result<Vec<FieldInfo>, MaskError> {
        let qualified = resolve_object_name(
            &self.rules,
            name,
            &self.current_database,
            self.default_schema.as_deref(),
        )?;
        let key = qualified.key();

        let table = self
            .catalog
            .find_table(&qualified.database, &key)
            .ok_or_else(|| {
                MaskError::schema_lookup(
                    &qualified.database,
                    qualified.schema.as_deref().unwrap_or_default(),
                    &qualified.table,
                )
            })
            .with_context(|| {
                format!(
                    "failed to find column list of table {:?}.{:?}",
                    qualified.database, key
                )
            })?;

        debug!(
            database = %qualified.database,
            table = %key,
            columns = table.columns.len(),
            "resolved table"
        );

        Ok(table
            .columns
            .iter()
            .map(|column| {
                FieldInfo::new(
                    &qualified.database,
                    &qualified.table,
                    &column.name,
                    column.sensitive,
                )
            })
            .collect())
    }

    fn alias_fields(&self, fields: &mut [FieldInfo], alias: Option<&TableAlias>) {
        if let Some(alias) = alias {
            propagate::apply_alias(fields, &self.rules.normalize(&alias.name));
        }
    }
}

impl<R: IdentifierRules> SensitivityWalker for SqlWalker<'_, R> {
    fn analyze_query(&mut self, query: &Query) -> Result<Vec<FieldInfo>, MaskError> {
        if query.with.is_some() {
            return self.unsupported(UnsupportedConstruct::Cte);
        }

        match query.body.as_ref() {
            SetExpr::Select(select) => self.analyze_select(select),
            SetExpr::Query(inner) => self.analyze_query(inner),
            SetExpr::SetOperation { .. } => self.unsupported(UnsupportedConstruct::SetOperation),
            SetExpr::Values(_) => self.unsupported(UnsupportedConstruct::Values),
            _ => self.unsupported(UnsupportedConstruct::Other),
        }
    }

    fn analyze_select(&mut self, select: &Select) -> Result<Vec<FieldInfo>, MaskError> {
        let items: Vec<ProjectionItem> = select
            .projection
            .iter()
            .map(|item| self.projection_item(item))
            .collect();

        if select.from.is_empty() {
            let rules = &self.rules;
            return Ok(propagate::project(items, self.scopes.visible(), |name| {
                rules.column_key(name)
            }));
        }

        let fields = self.analyze_from(&select.from)?;
        let rules = &self.rules;
        let scope = self.scopes.enter(fields);
        Ok(propagate::project(items, scope.visible(), |name| {
            rules.column_key(name)
        }))
    }

    fn analyze_from(&mut self, from: &[TableWithJoins]) -> Result<Vec<FieldInfo>, MaskError> {
        // Comma-separated sources form a cross join.
        let mut result = Vec::new();
        for source in from {
            let fields = self.analyze_table_source(source)?;
            result = propagate::cross_join(result, fields);
        }
        Ok(result)
    }

    fn analyze_table_source(
        &mut self,
        source: &TableWithJoins,
    ) -> Result<Vec<FieldInfo>, MaskError> {
        let line = source.relation.span().start.line;
        let part = match source.relation {
            TableFactor::NestedJoin { .. } => "table source item joined",
            _ => "object ref",
        };
        let left = self.analyze_object_ref(&source.relation).with_context(|| {
            format!("failed to extract sensitive fields of the left part of the {part} near line {line}")
        })?;

        propagate::fold_joins(left, &source.joins, |i, left, join| {
            let line = join.relation.span().start.line;
            self.analyze_join(left, join).with_context(|| {
                format!(
                    "failed to extract sensitive fields of the left part of the #{} join clause near line {line}",
                    i + 1
                )
            })
        })
    }

    fn analyze_join(
        &mut self,
        left: Vec<FieldInfo>,
        join: &Join,
    ) -> Result<Vec<FieldInfo>, MaskError> {
        let line = join.relation.span().start.line;
        let right = self.analyze_object_ref(&join.relation).with_context(|| {
            format!("failed to extract sensitive fields of the right part of the JOIN near line {line}")
        })?;

        Ok(propagate::merge_join(
            left,
            right,
            join_kind(&join.join_operator),
            |name| self.rules.column_key(name),
        ))
    }

    fn analyze_object_ref(&mut self, relation: &TableFactor) -> Result<Vec<FieldInfo>, MaskError> {
        let (mut fields, alias) = match relation {
            TableFactor::Table {
                name, alias, args, ..
            } => {
                let fields = if args.is_some() {
                    let construct = if is_flatten(name) {
                        UnsupportedConstruct::Flatten
                    } else {
                        UnsupportedConstruct::TableFunction
                    };
                    self.unsupported(construct)?
                } else {
                    self.resolve_table(name)?
                };
                (fields, alias.as_ref())
            }
            TableFactor::NestedJoin {
                table_with_joins,
                alias,
                ..
            } => (
                self.analyze_table_source(table_with_joins)?,
                alias.as_ref(),
            ),
            TableFactor::Derived {
                lateral,
                subquery,
                alias,
                ..
            } => {
                let construct = if *lateral {
                    UnsupportedConstruct::Lateral
                } else if matches!(subquery.body.as_ref(), SetExpr::Values(_)) {
                    UnsupportedConstruct::Values
                } else {
                    UnsupportedConstruct::Subquery
                };
                (self.unsupported(construct)?, alias.as_ref())
            }
            TableFactor::Function {
                lateral,
                name,
                alias,
                ..
            } => {
                let construct = if is_flatten(name) {
                    UnsupportedConstruct::Flatten
                } else if *lateral {
                    UnsupportedConstruct::Lateral
                } else {
                    UnsupportedConstruct::TableFunction
                };
                (self.unsupported(construct)?, alias.as_ref())
            }
            TableFactor::TableFunction { alias, .. } => (
                self.unsupported(UnsupportedConstruct::TableFunction)?,
                alias.as_ref(),
            ),
            TableFactor::UNNEST { alias, .. } => (
                self.unsupported(UnsupportedConstruct::Flatten)?,
                alias.as_ref(),
            ),
            _ => (self.unsupported(UnsupportedConstruct::Other)?, None),
        };

        self.alias_fields(&mut fields, alias);
        Ok(fields)
    }
}

/// Natural joins are spelled as a constraint on any join operator.
fn join_kind(operator: &JoinOperator) -> JoinKind {
    let constraint = match operator {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::CrossJoin(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::Anti(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c) => Some(c),
        _ => None,
    };

    match constraint {
        Some(JoinConstraint::Natural) => JoinKind::Natural,
        _ => JoinKind::Other,
    }
}

fn is_flatten(name: &ObjectName) -> bool {
    name.0
        .last()
        .and_then(|part| part.as_ident())
        .is_some_and(|ident| ident.value.eq_ignore_ascii_case("flatten"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SnowflakeRules;
    use crate::parser::SqlAnalyzer;
    use sqlparser::ast::Statement;
    use veil_core::{ColumnSchema, DatabaseSchema, TableSchema};

    fn catalog() -> Catalog {
        Catalog::default().with_database(
            DatabaseSchema::new("DB")
                .with_table(
                    TableSchema::new("PUBLIC.T")
                        .with_column(ColumnSchema::sensitive("A"))
                        .with_column(ColumnSchema::plain("B")),
                )
                .with_table(
                    TableSchema::new("PUBLIC.U")
                        .with_column(ColumnSchema::sensitive("A"))
                        .with_column(ColumnSchema::plain("C")),
                ),
        )
    }

    fn query(sql: &str) -> Box<Query> {
        match SqlAnalyzer::default().parse(sql).unwrap().remove(0) {
            Statement::Query(query) => query,
            other => panic!("expected a query, got {other}"),
        }
    }

    #[test]
    fn test_scope_is_released_after_successful_select() {
        let catalog = catalog();
        let mut walker = SqlWalker::new(&catalog, SnowflakeRules, &ExtractionConfig::new("DB"));

        let fields = walker.analyze_query(&query("SELECT * FROM t")).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(walker.scope_depth(), 1);
    }

    #[test]
    fn test_scope_is_released_after_failed_select() {
        let catalog = catalog();
        let mut walker = SqlWalker::new(&catalog, SnowflakeRules, &ExtractionConfig::new("DB"));

        assert!(walker.analyze_query(&query("SELECT * FROM missing")).is_err());
        assert_eq!(walker.scope_depth(), 1);
    }

    #[test]
    fn test_natural_join_operator_detection() {
        let q = query("SELECT * FROM t NATURAL JOIN u");
        let SetExpr::Select(select) = q.body.as_ref() else {
            panic!("expected a select body");
        };
        let join = &select.from[0].joins[0];
        assert_eq!(join_kind(&join.join_operator), JoinKind::Natural);

        let q = query("SELECT * FROM t LEFT JOIN u ON t.a = u.a");
        let SetExpr::Select(select) = q.body.as_ref() else {
            panic!("expected a select body");
        };
        let join = &select.from[0].joins[0];
        assert_eq!(join_kind(&join.join_operator), JoinKind::Other);
    }

    #[test]
    fn test_unsupported_construct_names() {
        assert_eq!(UnsupportedConstruct::TableFunction.to_string(), "table_function");
        assert_eq!(UnsupportedConstruct::Cte.to_string(), "cte");
    }
}
