use sqlparser::ast::{Join, JoinConstraint, JoinOperator, TableFactor, TableWithJoins};

use crate::authorizer::{combine, AuthorizationResult, NodeAuthorizer};
use crate::error::GateError;
use crate::parser::names::{fold_ident, relation_name};
use crate::policy::is_public_table;
use crate::relation::{build_virtual, Relation, RelationMap};

/// Join shapes the engine reasons about.
enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl NodeAuthorizer<'_> {
    /// Walk one FROM item: the leading table factor, then each join folded
    /// left to right.
    pub(crate) fn authorize_table_with_joins(
        &self,
        item: &TableWithJoins,
        incoming: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        let mut current = self.authorize_table_factor(&item.relation, incoming, neg)?;
        for join in &item.joins {
            current = self.authorize_join(current, join, neg)?;
        }
        Ok(current)
    }

    /// Walk a table factor: a base table reference, a derived table, or a
    /// parenthesized join. Unrecognized factors (table functions, UNNEST,
    /// ...) fail closed.
    pub(crate) fn authorize_table_factor(
        &self,
        factor: &TableFactor,
        incoming: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        self.checkpoint()?;
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table = relation_name(name);
                let alias_name = alias
                    .as_ref()
                    .map(|a| fold_ident(&a.name))
                    .unwrap_or_else(|| table.clone());
                let authorized = is_public_table(&table) || self.caller.is_admin();
                let columns = self.catalog.columns_of(&table);
                let relation = Relation::new_base(&table, &alias_name, authorized, &columns);

                let mut relations = incoming;
                relations.insert(&alias_name, relation.into_handle());
                Ok(AuthorizationResult {
                    authorized,
                    relations,
                    target_list: None,
                })
            }
            TableFactor::Derived {
                lateral,
                subquery,
                alias,
            } => {
                if *lateral {
                    // Correlated subselects would need outer-scope tracking
                    // the engine does not do.
                    return Ok(AuthorizationResult::denied(incoming));
                }
                // Subselects open a new scope.
                let mut result = self.authorize_query(subquery, RelationMap::new(), false)?;
                if let Some(alias) = alias {
                    let column_aliases: Vec<String> = alias
                        .columns
                        .iter()
                        .map(|column| fold_ident(&column.name))
                        .collect();
                    result.relations = build_virtual(
                        &fold_ident(&alias.name),
                        &column_aliases,
                        result.target_list.as_deref(),
                        &result.relations,
                    );
                    result.target_list = None;
                }
                Ok(result)
            }
            TableFactor::NestedJoin {
                table_with_joins,
                alias,
            } => {
                let mut result = self.authorize_table_with_joins(table_with_joins, incoming, neg)?;
                if let Some(alias) = alias {
                    let column_aliases: Vec<String> = alias
                        .columns
                        .iter()
                        .map(|column| fold_ident(&column.name))
                        .collect();
                    result.relations = build_virtual(
                        &fold_ident(&alias.name),
                        &column_aliases,
                        None,
                        &result.relations,
                    );
                }
                Ok(result)
            }
            _ => Ok(AuthorizationResult::denied(incoming)),
        }
    }

    /// Fold one join onto the result accumulated so far.
    ///
    /// The right side walks against the scope accumulated on the left, so
    /// both branch maps see every relation of this FROM item. When both
    /// sides are already authorized the join is. NATURAL and USING
    /// predicates are opaque to the engine: admins keep their bypass,
    /// everyone else fails. Otherwise the join type transforms the combined
    /// unauthorized sets and the ON predicate is walked against the
    /// combined map.
    fn authorize_join(
        &self,
        left: AuthorizationResult,
        join: &Join,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        self.checkpoint()?;

        let (kind, constraint) = match &join.join_operator {
            JoinOperator::Inner(constraint) => (JoinKind::Inner, Some(constraint)),
            JoinOperator::LeftOuter(constraint) => (JoinKind::Left, Some(constraint)),
            JoinOperator::RightOuter(constraint) => (JoinKind::Right, Some(constraint)),
            JoinOperator::FullOuter(constraint) => (JoinKind::Full, Some(constraint)),
            JoinOperator::CrossJoin => (JoinKind::Cross, None),
            other => {
                return Err(GateError::InternalWalk(format!(
                    "unsupported join type: {other:?}"
                )));
            }
        };

        let right = self.authorize_table_factor(&join.relation, left.relations.clone(), neg)?;

        let mut current = left.relations.clone();
        current.merge_from(&right.relations);

        if left.authorized && right.authorized {
            return Ok(AuthorizationResult::authorized(current));
        }

        if matches!(
            constraint,
            Some(JoinConstraint::Natural) | Some(JoinConstraint::Using(_))
        ) {
            return Ok(AuthorizationResult {
                authorized: self.caller.is_admin(),
                relations: current,
                target_list: None,
            });
        }

        match kind {
            JoinKind::Inner => {
                combine::update_by_intersection(
                    &mut current,
                    &[&left.relations, &right.relations],
                    combine::MissingBranch::Ignored,
                );
            }
            JoinKind::Left => {
                // Right-side rows may be null-padded, so the right side's
                // unauthorized components stop mattering. The right factor
                // walked over the accumulated left scope, so its map can
                // share the left side's handles; only the relations it
                // newly introduced are actually the right side.
                for (alias, handle) in right.relations.iter() {
                    if left.relations.get(alias).is_none() {
                        handle.borrow_mut().unauthorized.clear();
                    }
                }
            }
            JoinKind::Right => {
                for (_, handle) in left.relations.iter() {
                    handle.borrow_mut().unauthorized.clear();
                }
            }
            JoinKind::Full => {}
            JoinKind::Cross => {
                // No predicate to walk; relations surface as they are.
                return Ok(AuthorizationResult::denied(current));
            }
        }

        match constraint {
            Some(JoinConstraint::On(predicate)) => self.authorize_expr(predicate, current, neg),
            _ => Err(GateError::InternalWalk(
                "join carries no ON predicate".to_string(),
            )),
        }
    }
}
