use sqlparser::ast::Expr;

use crate::parser::names::fold_ident;

/// A column reference split into an optional relation qualifier and the
/// terminal column name.
///
/// `e.student_id` carries qualifier `e`; a bare `student_id` carries none and
/// is resolved against the relation under inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Relation alias qualifying the column, when written.
    pub qualifier: Option<String>,
    /// Terminal column name.
    pub column: String,
}

/// Extract a column reference from an expression.
///
/// Supports plain identifiers (`student_id`) and two-part qualified
/// identifiers (`e.student_id`). Anything longer or structurally different
/// is not a reference this engine matches predicates against.
pub fn extract_column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef {
            qualifier: None,
            column: fold_ident(ident),
        }),
        Expr::CompoundIdentifier(parts) if parts.len() == 2 => Some(ColumnRef {
            qualifier: Some(fold_ident(&parts[0])),
            column: fold_ident(&parts[1]),
        }),
        Expr::Nested(inner) => extract_column_ref(inner),
        _ => None,
    }
}

/// Extract an integer constant from an expression.
///
/// Only plain integer literals qualify; strings, booleans, and anything
/// computed are not constants the policy table can match.
pub fn extract_integer_value(expr: &Expr) -> Option<i32> {
    match expr {
        Expr::Value(_) => expr.to_string().parse().ok(),
        Expr::Nested(inner) => extract_integer_value(inner),
        _ => None,
    }
}

/// Extract a `(column, integer constant)` pair from the two operands of a
/// comparison, accepting either order.
///
/// Only `column = constant` shapes authorize anything; `subquery = column`
/// and similar contribute nothing to the decision.
pub fn extract_column_and_constant(lhs: &Expr, rhs: &Expr) -> Option<(ColumnRef, i32)> {
    if let (Some(column), Some(value)) = (extract_column_ref(lhs), extract_integer_value(rhs)) {
        return Some((column, value));
    }
    if let (Some(value), Some(column)) = (extract_integer_value(lhs), extract_column_ref(rhs)) {
        return Some((column, value));
    }
    None
}
