use sqlparser::ast::{Ident, ObjectName};

/// Fold a parsed identifier the way `PostgreSQL` resolves it: unquoted
/// identifiers fold to lowercase, quoted identifiers keep their spelling.
pub fn fold_ident(ident: &Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_ascii_lowercase()
    }
}

/// Resolve an object name to its terminal relation identifier, folded.
///
/// Drops any schema qualification: the catalog and the policy table both
/// key on bare table names.
///
/// Examples:
/// - `public.student` -> `"student"`
/// - `"public"."Student"` -> `"Student"`
pub fn relation_name(name: &ObjectName) -> String {
    name.0.last().map(fold_ident).unwrap_or_default()
}
