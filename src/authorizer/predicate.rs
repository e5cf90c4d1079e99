use std::rc::Rc;

use sqlparser::ast::{BinaryOperator, Expr, Query, UnaryOperator};

use crate::authorizer::{combine, AuthorizationResult, NodeAuthorizer};
use crate::error::GateError;
use crate::parser::expr::{
    extract_column_and_constant, extract_column_ref, extract_integer_value, ColumnRef,
};
use crate::parser::names::fold_ident;
use crate::policy::authorization_context;
use crate::relation::model::{resolve_column, RelationHandle};
use crate::relation::RelationMap;

impl NodeAuthorizer<'_> {
    /// Walk a predicate expression against the relations in scope.
    ///
    /// Boolean connectives compose sub-results (union under OR, intersection
    /// under AND), NOT toggles the polarity of the operator the comparison
    /// matcher looks for, and sublinks recurse into their subselect. Every
    /// other expression kind contributes nothing and fails closed.
    pub(crate) fn authorize_expr(
        &self,
        expr: &Expr,
        relations: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        self.checkpoint()?;
        match expr {
            Expr::Nested(inner) => self.authorize_expr(inner, relations, neg),
            Expr::BinaryOp {
                op: BinaryOperator::And,
                ..
            } => self.authorize_bool_chain(expr, &BinaryOperator::And, relations, neg),
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            } => self.authorize_bool_chain(expr, &BinaryOperator::Or, relations, neg),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: inner,
            } => {
                let mut result = self.authorize_expr(inner, relations, !neg)?;
                result.authorized = result.authorized && result.relations.all_authorized();
                Ok(result)
            }
            Expr::InList {
                expr: inner,
                list,
                negated,
            } => self.authorize_in_list(inner, list, *negated, relations, neg),
            Expr::BinaryOp { left, op, right } => {
                self.authorize_comparison(left, op, right, relations, neg)
            }
            Expr::Subquery(query) => self.authorize_query(query, relations, neg),
            Expr::Exists { subquery, .. } => self.authorize_query(subquery, relations, neg),
            Expr::InSubquery { subquery, .. } => self.authorize_query(subquery, relations, neg),
            _ => Ok(AuthorizationResult::denied(relations)),
        }
    }

    /// Walk an AND/OR chain.
    ///
    /// Operand chains of one operator are flattened so `a AND b AND c`
    /// composes as one three-way intersection, then every operand walks
    /// against a deep clone of the incoming map and the per-operand results
    /// combine. The final flag is recomputed from the surviving relations.
    fn authorize_bool_chain(
        &self,
        expr: &Expr,
        op: &BinaryOperator,
        relations: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        let mut operands = Vec::new();
        flatten_chain(expr, op, &mut operands);

        let mut result_map = relations.clone_deep();
        let mut branch_maps = Vec::with_capacity(operands.len());
        for operand in operands {
            let branch = self.authorize_expr(operand, result_map.clone(), neg)?;
            branch_maps.push(branch.relations);
        }
        let branches: Vec<&RelationMap> = branch_maps.iter().collect();

        match op {
            BinaryOperator::And => combine::update_by_intersection(
                &mut result_map,
                &branches,
                combine::MissingBranch::Authorizes,
            ),
            _ => combine::update_by_union(&mut result_map, &branches),
        }

        let authorized = result_map.all_authorized();
        Ok(AuthorizationResult {
            authorized,
            relations: result_map,
            target_list: None,
        })
    }

    /// Match `a op b` against the polarity-selected operator and credit
    /// relations from a `(column, integer constant)` pair in either operand
    /// order. The row-and-sublink shape is handled here too.
    fn authorize_comparison(
        &self,
        lhs: &Expr,
        op: &BinaryOperator,
        rhs: &Expr,
        relations: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        let result = relations.clone_deep();

        let wanted = if neg {
            BinaryOperator::NotEq
        } else {
            BinaryOperator::Eq
        };
        if *op != wanted {
            return Ok(AuthorizationResult::denied(result));
        }

        if let Some((column, value)) = extract_column_and_constant(lhs, rhs) {
            self.credit_relations(&result, &column, value);
        }

        if let (Expr::Tuple(row), Expr::Subquery(subquery)) = (lhs, rhs) {
            self.credit_row_sublink(&result, row, subquery, neg)?;
        }

        let authorized = result.all_authorized();
        Ok(AuthorizationResult {
            authorized,
            relations: result,
            target_list: None,
        })
    }

    /// Match `a IN (v)` with exactly one element and the negation polarity
    /// aligned with the surrounding NOTs.
    fn authorize_in_list(
        &self,
        inner: &Expr,
        list: &[Expr],
        negated: bool,
        relations: RelationMap,
        neg: bool,
    ) -> Result<AuthorizationResult, GateError> {
        let result = relations.clone_deep();

        if negated != neg || list.len() != 1 {
            return Ok(AuthorizationResult::denied(result));
        }
        let Some(column) = extract_column_ref(inner) else {
            return Ok(AuthorizationResult::denied(result));
        };
        let Some(value) = extract_integer_value(&list[0]) else {
            return Ok(AuthorizationResult::denied(result));
        };

        self.credit_relations(&result, &column, value);

        let authorized = result.all_authorized();
        Ok(AuthorizationResult {
            authorized,
            relations: result,
            target_list: None,
        })
    }

    /// Apply one `(column, value)` equality to every relation in the map.
    ///
    /// Base relations flip their own flag; virtual relations shed each
    /// unauthorized component the predicate covers and become authorized
    /// once the set empties.
    fn credit_relations(&self, map: &RelationMap, column: &ColumnRef, value: i32) {
        for (_, handle) in map.iter() {
            let is_database = handle.borrow().is_database;
            if is_database {
                if handle.borrow().authorized {
                    continue;
                }
                if self.predicate_authorizes(column, value, handle, handle) {
                    handle.borrow_mut().authorized = true;
                }
            } else {
                let components: Vec<(String, RelationHandle)> =
                    handle.borrow().unauthorized.clone();
                let mut cleared = Vec::new();
                for (component_alias, component) in &components {
                    if self.predicate_authorizes(column, value, handle, component) {
                        component.borrow_mut().authorized = true;
                        cleared.push(component_alias.clone());
                    }
                }
                let mut relation = handle.borrow_mut();
                for component_alias in cleared {
                    relation.remove_unauthorized(&component_alias);
                }
                if relation.unauthorized.is_empty() {
                    relation.authorized = true;
                }
            }
        }
    }

    /// Decide whether `column = value` authorizes `component`, resolving the
    /// column alias through `target`.
    ///
    /// The reference must name the target's scope alias, resolve to one of
    /// the policy's authorizing columns, and carry an allowed value. An
    /// unresolvable reference falls back to the policy's bypass flag, so
    /// public tables and admins stay authorized regardless.
    fn predicate_authorizes(
        &self,
        column: &ColumnRef,
        value: i32,
        target: &RelationHandle,
        component: &RelationHandle,
    ) -> bool {
        let target_alias = target.borrow().alias.clone();
        let qualifier = column
            .qualifier
            .clone()
            .unwrap_or_else(|| target_alias.clone());

        let table_name = component.borrow().name.clone();
        let policy = authorization_context(&table_name, self.caller);

        let Some(resolved) = resolve_column(target, &column.column) else {
            return policy.bypass;
        };
        if qualifier != target_alias || !policy.is_authorizing_column(&resolved.name) {
            return policy.bypass;
        }
        if !policy.allowed_values(&resolved.name).contains(&value) {
            return policy.bypass;
        }
        true
    }

    /// Credit relations tied to an authorized subselect through a row
    /// comparison: `(r.authz_col, other_col) = (SELECT ...)`.
    ///
    /// For each row member naming a relation in scope, the member must
    /// resolve to an authorizing column of its source table; the sublink is
    /// then authorized against an empty map, and when it contains an
    /// authorized base relation for that source table the outer relation is
    /// credited.
    fn credit_row_sublink(
        &self,
        map: &RelationMap,
        row: &[Expr],
        subquery: &Query,
        neg: bool,
    ) -> Result<(), GateError> {
        for member in row {
            let Expr::CompoundIdentifier(parts) = member else {
                continue;
            };
            if parts.len() < 2 {
                continue;
            }
            let relation_alias = fold_ident(&parts[0]);
            let column_alias = fold_ident(&parts[1]);

            let Some(handle) = map.get(&relation_alias) else {
                continue;
            };
            if handle.borrow().authorized {
                continue;
            }
            let Some(resolved) = resolve_column(handle, &column_alias) else {
                continue;
            };
            let source_name = resolved.source.borrow().name.clone();
            let policy = authorization_context(&source_name, self.caller);
            if !policy.is_authorizing_column(&resolved.name) {
                continue;
            }

            let sub_result = self.authorize_query(subquery, RelationMap::new(), neg)?;
            let mut credited = false;
            for (_, sub_handle) in sub_result.relations.iter() {
                let sub = sub_handle.borrow();
                if sub.is_database && sub.name == source_name && sub.authorized {
                    credited = true;
                    break;
                }
            }
            if !credited {
                continue;
            }

            resolved.source.borrow_mut().authorized = true;
            if Rc::ptr_eq(&resolved.source, handle) {
                continue;
            }
            let mut relation = handle.borrow_mut();
            let cleared: Vec<String> = relation
                .unauthorized
                .iter()
                .filter(|(_, component)| component.borrow().name == source_name)
                .map(|(component_alias, _)| component_alias.clone())
                .collect();
            for component_alias in cleared {
                relation.remove_unauthorized(&component_alias);
            }
            if relation.unauthorized.is_empty() {
                relation.authorized = true;
            }
        }
        Ok(())
    }
}

/// Flatten a chain of one binary operator into its operand list, restoring
/// the N-ary grouping the `PostgreSQL` AST uses for boolean expressions.
fn flatten_chain<'e>(expr: &'e Expr, op: &BinaryOperator, out: &mut Vec<&'e Expr>) {
    if let Expr::BinaryOp {
        left,
        op: node_op,
        right,
    } = expr
    {
        if node_op == op {
            flatten_chain(left, op, out);
            flatten_chain(right, op, out);
            return;
        }
    }
    out.push(expr);
}
