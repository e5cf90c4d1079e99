/// Cross-branch union and intersection of unauthorized sets.
pub mod combine;
mod from_clause;
mod predicate;
mod select;

use sqlparser::ast::SelectItem;
use tokio_util::sync::CancellationToken;

use crate::caller::CallerContext;
use crate::catalog::SchemaCatalog;
use crate::error::GateError;
use crate::relation::RelationMap;

/// Outcome of walking one AST node.
#[derive(Debug)]
pub struct AuthorizationResult {
    /// True when every relation visible at this node is authorized.
    pub authorized: bool,
    /// Relations visible to the enclosing scope, in insertion order.
    pub relations: RelationMap,
    /// Projection of a SELECT, carried out only for an immediately enclosing
    /// derived table that needs positional column aliases.
    pub target_list: Option<Vec<SelectItem>>,
}

impl AuthorizationResult {
    /// A not-yet-authorized result over `relations`.
    pub fn denied(relations: RelationMap) -> Self {
        AuthorizationResult {
            authorized: false,
            relations,
            target_list: None,
        }
    }

    /// An authorized result over `relations`.
    pub fn authorized(relations: RelationMap) -> Self {
        AuthorizationResult {
            authorized: true,
            relations,
            target_list: None,
        }
    }
}

/// Recursive authorization walker over a parsed SELECT.
///
/// One walk per query; the walk is single-threaded and never suspends. Every
/// node kind without an explicit rule returns unauthorized, so unknown SQL
/// constructs fail closed. Relations only ever move from unauthorized to
/// authorized; nothing is ever un-authorized.
pub struct NodeAuthorizer<'a> {
    pub(crate) catalog: &'a SchemaCatalog,
    pub(crate) caller: &'a CallerContext,
    cancel: CancellationToken,
}

impl<'a> NodeAuthorizer<'a> {
    /// Walker without external cancellation.
    pub fn new(catalog: &'a SchemaCatalog, caller: &'a CallerContext) -> Self {
        Self::with_cancellation(catalog, caller, CancellationToken::new())
    }

    /// Walker that short-circuits between AST nodes once `cancel` fires.
    pub fn with_cancellation(
        catalog: &'a SchemaCatalog,
        caller: &'a CallerContext,
        cancel: CancellationToken,
    ) -> Self {
        NodeAuthorizer {
            catalog,
            caller,
            cancel,
        }
    }

    /// Abort the walk once the request is gone. Reported upstream as a plain
    /// denial, never as a distinct cancellation outcome.
    pub(crate) fn checkpoint(&self) -> Result<(), GateError> {
        if self.cancel.is_cancelled() {
            return Err(GateError::Cancelled);
        }
        Ok(())
    }
}
