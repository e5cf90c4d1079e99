use sqlparser::ast::{Query, Select, SetExpr, SetOperator};

use crate::authorizer::{combine, AuthorizationResult, NodeAuthorizer};
use crate::error::GateError;
use crate::relation::RelationMap;

impl NodeAuthorizer<'_> {
    /// Walk a query: WITH clause first, then the body.
    ///
    /// Each CTE is authorized independently; its relations merge into the
    /// accumulator and its authorization bit is ANDed in. A `SELECT INTO`
    /// short-circuits as authorized with no relations, writes are filtered
    /// elsewhere.
    pub fn authorize_query(
        &self,
        query: &Query,
        incoming: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        self.checkpoint()?;

        if let SetExpr::Select(select) = query.body.as_ref() {
            if select.into.is_some() {
                return Ok(AuthorizationResult::authorized(RelationMap::new()));
            }
        }

        let mut seed = AuthorizationResult::authorized(RelationMap::new());
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let cte_result = self.authorize_query(&cte.query, incoming.clone(), neg)?;
                let mut merged = cte_result.relations;
                merged.merge_from(&seed.relations);
                seed.relations = merged;
                seed.authorized = seed.authorized && cte_result.authorized;
            }
        }

        self.authorize_set_expr(query.body.as_ref(), incoming, neg, seed)
    }

    /// Walk a query body: a plain SELECT, a parenthesized query, or a set
    /// operation. Anything else (VALUES and friends) fails closed.
    fn authorize_set_expr(
        &self,
        body: &SetExpr,
        incoming: RelationMap,
        neg: bool,
        mut seed: AuthorizationResult,
    ) -> Result<AuthorizationResult, GateError> {
        self.checkpoint()?;
        match body {
            SetExpr::Select(select) => self.authorize_select(select, incoming, neg, seed),
            SetExpr::Query(inner) => {
                let result = self.authorize_query(inner, incoming, neg)?;
                seed.authorized = seed.authorized && result.authorized;
                seed.relations.merge_from(&result.relations);
                seed.target_list = result.target_list;
                Ok(seed)
            }
            SetExpr::SetOperation {
                op, left, right, ..
            } => self.authorize_set_operation(*op, left, right, incoming, neg, seed),
            _ => Ok(AuthorizationResult::denied(incoming)),
        }
    }

    /// UNION, INTERSECT, and EXCEPT over two query bodies.
    ///
    /// UNION: a row may come from either side, so both sides must authorize
    /// and the surviving unauthorized sets union. INTERSECT: a row must
    /// appear on both sides; one authorized side suffices and the sets
    /// intersect. EXCEPT delegates to the left side only; filtering done by
    /// the right side is never credited.
    fn authorize_set_operation(
        &self,
        op: SetOperator,
        left: &SetExpr,
        right: &SetExpr,
        incoming: RelationMap,
        neg: bool,
        mut seed: AuthorizationResult,
    ) -> Result<AuthorizationResult, GateError> {
        if op == SetOperator::Except {
            return self.authorize_set_expr(
                left,
                incoming,
                neg,
                AuthorizationResult::authorized(RelationMap::new()),
            );
        }

        let left_result = self.authorize_set_expr(
            left,
            incoming.clone(),
            neg,
            AuthorizationResult::authorized(RelationMap::new()),
        )?;
        let right_result = self.authorize_set_expr(
            right,
            incoming,
            neg,
            AuthorizationResult::authorized(RelationMap::new()),
        )?;

        seed.relations.merge_from(&left_result.relations);
        seed.relations.merge_from(&right_result.relations);

        match op {
            SetOperator::Union => {
                seed.authorized =
                    seed.authorized && left_result.authorized && right_result.authorized;
                combine::update_by_union(
                    &mut seed.relations,
                    &[&left_result.relations, &right_result.relations],
                );
            }
            SetOperator::Intersect => {
                seed.authorized =
                    seed.authorized && (left_result.authorized || right_result.authorized);
                combine::update_by_intersection(
                    &mut seed.relations,
                    &[&left_result.relations, &right_result.relations],
                    combine::MissingBranch::Authorizes,
                );
            }
            other => {
                return Err(GateError::InternalWalk(format!(
                    "unsupported set operation: {other:?}"
                )));
            }
        }

        if left_result.target_list.is_some() && right_result.target_list.is_some() {
            seed.target_list = left_result.target_list;
        }
        Ok(seed)
    }

    /// Walk one SELECT: FROM items in order, then WHERE, then HAVING.
    ///
    /// WHERE and HAVING are only consulted while the accumulated result is
    /// still unauthorized, and each replaces the relation map wholesale
    /// because authorizing predicates mutate authorization flags.
    fn authorize_select(
        &self,
        select: &Select,
        incoming: RelationMap,
        neg: bool,
        mut seed: AuthorizationResult,
    ) -> Result<AuthorizationResult, GateError> {
        for item in &select.from {
            let from_result = self.authorize_table_with_joins(item, incoming.clone(), neg)?;
            seed.relations.merge_from(&from_result.relations);
            seed.authorized = seed.authorized && from_result.authorized;
        }

        if !seed.authorized {
            if let Some(predicate) = &select.selection {
                let where_result =
                    self.authorize_expr(predicate, seed.relations.clone(), neg)?;
                seed.relations = where_result.relations;
                seed.authorized = where_result.authorized;
            }
        }

        if !seed.authorized {
            if let Some(predicate) = &select.having {
                let having_result =
                    self.authorize_expr(predicate, seed.relations.clone(), neg)?;
                seed.relations = having_result.relations;
                seed.authorized = having_result.authorized;
            }
        }

        seed.target_list = Some(select.projection.clone());
        Ok(seed)
    }
}
