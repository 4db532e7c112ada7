//! Dialect-agnostic sensitivity propagation.
//!
//! These functions turn the field lists produced for individual table
//! references into the field list of a whole FROM clause, and from there into
//! the fields a select list returns. They never sort or reorder: output order
//! is catalog column order, then table-source order, then join order.
//!
//! Column names are compared through a key function supplied by the caller,
//! so a dialect whose column names are case-insensitive can fold them.

use std::collections::HashMap;

use tracing::debug;

use crate::error::MaskError;
use crate::field::FieldInfo;

/// How a join combines its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `NATURAL JOIN`: same-named columns collapse into the left one.
    Natural,
    /// Every other join: both sides are kept side by side.
    Other,
}

/// One select-list item, reduced to what propagation understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionItem {
    /// `*`: every visible column, minus the normalized names listed in
    /// `EXCLUDE (...)` / `EXCEPT (...)`.
    Wildcard { exclude: Vec<String> },
    /// An unqualified column name, already normalized.
    Column(String),
    /// Anything else (expressions, qualified references). Contributes nothing.
    Unsupported,
}

/// Concatenate the fields of comma-separated table sources.
///
/// `FROM a, b` is a cross join: nothing is deduplicated.
pub fn cross_join(mut left: Vec<FieldInfo>, right: Vec<FieldInfo>) -> Vec<FieldInfo> {
    left.extend(right);
    left
}

/// Merge the right side of a join into the accumulated left side.
pub fn merge_join<K>(
    left: Vec<FieldInfo>,
    right: Vec<FieldInfo>,
    kind: JoinKind,
    column_key: K,
) -> Vec<FieldInfo>
where
    K: Fn(&str) -> String,
{
    match kind {
        JoinKind::Natural => natural_merge(left, right, column_key),
        JoinKind::Other => cross_join(left, right),
    }
}

/// Natural join merge.
///
/// Right columns whose name is not on the left are appended in order. A right
/// column whose name is already on the left is dropped, but if it is sensitive
/// the left column becomes sensitive too. When the left side itself holds the
/// name more than once, the last occurrence is the one that absorbs it.
pub fn natural_merge<K>(
    left: Vec<FieldInfo>,
    right: Vec<FieldInfo>,
    column_key: K,
) -> Vec<FieldInfo>
where
    K: Fn(&str) -> String,
{
    let left_index: HashMap<String, usize> = left
        .iter()
        .enumerate()
        .map(|(i, field)| (column_key(field.name()), i))
        .collect();

    let left_width = left.len();
    let right_width = right.len();

    let mut result = left;
    for field in right {
        match left_index.get(&column_key(field.name())) {
            None => result.push(field),
            Some(&i) => {
                if field.is_sensitive() {
                    result[i].mark_sensitive();
                }
            }
        }
    }

    debug!(
        left = left_width,
        right = right_width,
        merged = result.len(),
        "natural join merged"
    );
    result
}

/// Fold join clauses left to right over an initial field list, so that
/// `t1 JOIN t2 JOIN t3` is evaluated as `(t1 JOIN t2) JOIN t3`.
///
/// `step` receives the zero-based clause index, the accumulated left side and
/// the clause, and returns the next left side.
pub fn fold_joins<'j, J, F>(
    initial: Vec<FieldInfo>,
    joins: &'j [J],
    mut step: F,
) -> Result<Vec<FieldInfo>, MaskError>
where
    F: FnMut(usize, Vec<FieldInfo>, &'j J) -> Result<Vec<FieldInfo>, MaskError>,
{
    joins
        .iter()
        .enumerate()
        .try_fold(initial, |left, (i, join)| step(i, left, join))
}

/// Rename the table of every field to `alias`.
pub fn apply_alias(fields: &mut [FieldInfo], alias: &str) {
    for field in fields {
        field.rename_table(alias);
    }
}

/// Evaluate a select list against the visible scope.
///
/// A column name selects every visible column with that name, so an ambiguous
/// name yields one output per match.
pub fn project<I, K>(items: I, scope: &[FieldInfo], column_key: K) -> Vec<FieldInfo>
where
    I: IntoIterator<Item = ProjectionItem>,
    K: Fn(&str) -> String,
{
    let mut result = Vec::new();
    for item in items {
        match item {
            ProjectionItem::Wildcard { exclude } => {
                let excluded: Vec<String> = exclude.iter().map(|name| column_key(name)).collect();
                result.extend(
                    scope
                        .iter()
                        .filter(|f| !excluded.contains(&column_key(f.name())))
                        .cloned(),
                );
            }
            ProjectionItem::Column(name) => {
                let key = column_key(&name);
                result.extend(scope.iter().filter(|f| column_key(f.name()) == key).cloned());
            }
            ProjectionItem::Unsupported => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn f(table: &str, name: &str, sensitive: bool) -> FieldInfo {
        FieldInfo::new("DB", table, name, sensitive)
    }

    fn exact(name: &str) -> String {
        name.to_string()
    }

    fn wildcard() -> ProjectionItem {
        ProjectionItem::Wildcard {
            exclude: Vec::new(),
        }
    }

    fn flags(fields: &[FieldInfo]) -> Vec<(&str, bool)> {
        fields.iter().map(|f| (f.name(), f.is_sensitive())).collect()
    }

    #[test]
    fn test_natural_merge_ors_sensitivity_and_keeps_left_order() {
        let left = vec![f("L", "a", false), f("L", "b", true)];
        let right = vec![f("R", "a", true), f("R", "c", false)];

        let merged = natural_merge(left, right, exact);
        assert_eq!(flags(&merged), vec![("a", true), ("b", true), ("c", false)]);
        // the surviving `a` is the left one
        assert_eq!(merged[0].table(), "L");
    }

    #[test]
    fn test_natural_merge_never_clears_sensitivity() {
        let merged = natural_merge(vec![f("L", "a", true)], vec![f("R", "a", false)], exact);
        assert_eq!(flags(&merged), vec![("a", true)]);
    }

    #[test]
    fn test_natural_merge_duplicate_left_name_marks_last_occurrence() {
        let left = vec![f("L1", "a", false), f("L2", "a", false)];
        let merged = natural_merge(left, vec![f("R", "a", true)], exact);
        assert_eq!(flags(&merged), vec![("a", false), ("a", true)]);
    }

    #[test]
    fn test_other_join_keeps_both_sides() {
        let left = vec![f("L", "a", false), f("L", "b", true)];
        let right = vec![f("R", "a", true), f("R", "c", false)];

        let merged = merge_join(left, right, JoinKind::Other, exact);
        assert_eq!(
            flags(&merged),
            vec![("a", false), ("b", true), ("a", true), ("c", false)]
        );
    }

    #[test]
    fn test_fold_joins_is_left_associative() {
        let joins = vec![
            vec![f("T2", "b", false)],
            vec![f("T3", "c", true)],
        ];
        let mut seen = Vec::new();

        let folded = fold_joins(vec![f("T1", "a", false)], &joins, |i, left, right| {
            seen.push((i, left.len()));
            Ok(merge_join(left, right.clone(), JoinKind::Other, exact))
        })
        .unwrap();

        assert_eq!(seen, vec![(0, 1), (1, 2)]);
        assert_eq!(flags(&folded), vec![("a", false), ("b", false), ("c", true)]);
    }

    #[test]
    fn test_fold_joins_stops_at_first_error() {
        let joins = vec![1, 2, 3];
        let mut calls = 0;
        let result = fold_joins(Vec::new(), &joins, |i, left, _| {
            calls += 1;
            if i == 1 {
                Err(MaskError::Parse("bad".to_string()))
            } else {
                Ok(left)
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_apply_alias_only_touches_table() {
        let mut fields = vec![f("T", "a", true), f("T", "b", false)];
        apply_alias(&mut fields, "X");
        assert_eq!(fields, vec![f("X", "a", true), f("X", "b", false)]);
    }

    #[test]
    fn test_project_duplicates_ambiguous_column() {
        let scope = vec![f("T1", "a", false), f("T2", "a", true), f("T2", "b", false)];
        let projected = project([ProjectionItem::Column("a".to_string())], &scope, exact);
        assert_eq!(flags(&projected), vec![("a", false), ("a", true)]);
    }

    #[test]
    fn test_project_mixes_items_in_select_order() {
        let scope = vec![f("T", "a", true), f("T", "b", false)];
        let projected = project(
            [
                ProjectionItem::Column("b".to_string()),
                ProjectionItem::Unsupported,
                wildcard(),
                ProjectionItem::Column("missing".to_string()),
            ],
            &scope,
            exact,
        );
        assert_eq!(flags(&projected), vec![("b", false), ("a", true), ("b", false)]);
    }

    #[test]
    fn test_column_key_folds_case_when_matching() {
        let scope = vec![f("T", "id", false), f("T", "card", true)];
        let lower = |name: &str| name.to_lowercase();

        let projected = project([ProjectionItem::Column("CARD".to_string())], &scope, lower);
        assert_eq!(flags(&projected), vec![("card", true)]);

        let projected = project([ProjectionItem::Column("CARD".to_string())], &scope, exact);
        assert!(projected.is_empty());
    }

    #[test]
    fn test_natural_merge_uses_column_key() {
        let lower = |name: &str| name.to_lowercase();
        let merged = natural_merge(vec![f("L", "Card", false)], vec![f("R", "card", true)], lower);
        assert_eq!(flags(&merged), vec![("Card", true)]);
    }

    #[test]
    fn test_wildcard_exclusion_drops_named_columns() {
        let scope = vec![f("T", "a", true), f("T", "b", false), f("U", "a", false)];
        let projected = project(
            [ProjectionItem::Wildcard {
                exclude: vec!["a".to_string()],
            }],
            &scope,
            exact,
        );
        assert_eq!(flags(&projected), vec![("b", false)]);
    }
}
