use std::rc::Rc;

use sqlparser::ast::{Expr, SelectItem};

use crate::parser::names::{fold_ident, relation_name};
use crate::relation::map::RelationMap;
use crate::relation::model::{ColumnBinding, Relation, RelationHandle};

/// Construct the virtual relation for an aliased scope: a subselect result or
/// an aliased join.
///
/// `sources` is the relation map of the inner scope and `target_list` its
/// projection (absent when the outer context is `*`-equivalent, e.g. an
/// aliased join). `column_aliases` are the outer alias's explicit column
/// names, consumed positionally left to right.
///
/// Column-producing targets are `*`, `table.*`, and `table.col`; function
/// calls and arithmetic contribute no columns. Every still-unauthorized
/// source relation, and any unauthorized component nested inside a source,
/// is carried into the new relation's unauthorized set.
///
/// Returns a map containing only the new virtual relation.
pub fn build_virtual(
    alias: &str,
    column_aliases: &[String],
    target_list: Option<&[SelectItem]>,
    sources: &RelationMap,
) -> RelationMap {
    let mut relation = Relation {
        name: alias.to_string(),
        alias: alias.to_string(),
        is_database: false,
        authorized: false,
        columns: Vec::new(),
        unauthorized: Vec::new(),
    };

    let total_columns: usize = sources
        .iter()
        .map(|(_, handle)| handle.borrow().columns.len())
        .sum();

    let mut next_alias = 0usize;
    match target_list {
        Some(targets) => {
            for target in targets {
                let (expr, as_name) = match target {
                    SelectItem::Wildcard(_) => {
                        let end = (next_alias + total_columns).min(column_aliases.len());
                        append_all_sources(&mut relation, sources, &column_aliases[next_alias..end]);
                        next_alias = end;
                        continue;
                    }
                    SelectItem::QualifiedWildcard(qualifier, _) => {
                        let table = relation_name(qualifier);
                        if let Some(source) = sources.get(&table) {
                            let count = source.borrow().columns.len();
                            let end = (next_alias + count).min(column_aliases.len());
                            append_source_columns(
                                &mut relation,
                                source,
                                &column_aliases[next_alias..end],
                            );
                            next_alias = end;
                        }
                        continue;
                    }
                    SelectItem::UnnamedExpr(expr) => (expr, None),
                    SelectItem::ExprWithAlias { expr, alias } => (expr, Some(fold_ident(alias))),
                };

                let Expr::CompoundIdentifier(parts) = expr else {
                    continue;
                };
                if parts.len() != 2 {
                    continue;
                }
                let table = fold_ident(&parts[0]);
                let column = fold_ident(&parts[1]);
                let Some(source) = sources.get(&table) else {
                    continue;
                };

                let mut outward = as_name.unwrap_or_else(|| column.clone());
                if next_alias < column_aliases.len() && !column_aliases[next_alias].is_empty() {
                    outward = column_aliases[next_alias].clone();
                    next_alias += 1;
                }
                append_column(&mut relation, source, &column, &outward);
            }
        }
        None => append_all_sources(&mut relation, sources, column_aliases),
    }

    for (source_alias, source) in sources.iter() {
        if !source.borrow().authorized {
            relation.set_unauthorized(source_alias, Rc::clone(source));
        }
    }
    for (_, source) in sources.iter() {
        let components: Vec<(String, RelationHandle)> = source.borrow().unauthorized.clone();
        for (component_alias, component) in components {
            relation.set_unauthorized(&component_alias, component);
        }
    }
    relation.authorized = relation.unauthorized.is_empty();

    RelationMap::singleton(alias, relation.into_handle())
}

/// Append one column bound to `source`, if the source exposes it.
fn append_column(relation: &mut Relation, source: &RelationHandle, column: &str, outward: &str) {
    if source.borrow().column(column).is_none() {
        return;
    }
    relation.set_column(
        outward,
        ColumnBinding {
            name: column.to_string(),
            source: Some(Rc::clone(source)),
        },
    );
}

/// Append every column of `source` in order, consuming outer aliases
/// positionally.
fn append_source_columns(relation: &mut Relation, source: &RelationHandle, aliases: &[String]) {
    let column_aliases: Vec<String> = source
        .borrow()
        .columns
        .iter()
        .map(|(alias, _)| alias.clone())
        .collect();
    for (index, column) in column_aliases.iter().enumerate() {
        let outward = aliases.get(index).filter(|a| !a.is_empty());
        append_column(
            relation,
            source,
            column,
            outward.map(String::as_str).unwrap_or(column),
        );
    }
}

/// Append every column of every source relation in scope order.
fn append_all_sources(relation: &mut Relation, sources: &RelationMap, aliases: &[String]) {
    let mut next_alias = 0usize;
    for (_, source) in sources.iter() {
        let count = source.borrow().columns.len();
        let end = (next_alias + count).min(aliases.len());
        append_source_columns(relation, source, &aliases[next_alias..end]);
        next_alias = end;
    }
}
