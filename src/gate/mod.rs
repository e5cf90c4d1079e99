use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::authorizer::NodeAuthorizer;
use crate::caller::{CallerDirectory, Role};
use crate::catalog::SchemaCatalog;
use crate::error::{GateError, DENIED_MESSAGE};
use crate::parser::sql_parser::{clean_sql, parse_select};
use crate::parser::tables::referenced_relations;
use crate::relation::RelationMap;

/// The validated session behind a query.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// Caller role from the session token.
    pub role: Role,
    /// Caller user id from the session token.
    pub user_id: i32,
}

/// Outcome of validating one statement.
///
/// The message is present exactly when the statement is not authorized, and
/// is the same opaque string for every failure kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// True when the statement may run for this caller.
    pub authorized: bool,
    /// User-visible denial message; never discloses the reason.
    pub message: Option<String>,
}

impl Verdict {
    fn allowed() -> Self {
        Verdict {
            authorized: true,
            message: None,
        }
    }

    fn denied() -> Self {
        Verdict {
            authorized: false,
            message: Some(DENIED_MESSAGE.to_string()),
        }
    }
}

/// Result of an executed SELECT, shaped for the chat layer.
#[derive(Debug, Default, Serialize)]
pub struct QueryOutput {
    /// Column names in projection order.
    pub columns: Vec<String>,
    /// Number of materialized rows.
    pub row_count: usize,
    /// One column-to-value map per row.
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Runs validated SELECT text against storage.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute `sql` read-only and materialize the result.
    async fn run_select(&self, sql: &str) -> Result<QueryOutput, GateError>;
}

/// Outcome of [`QueryGate::execute`].
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// The statement ran; here is the materialized result.
    Rows(QueryOutput),
    /// The statement was denied or failed; the opaque message to show.
    Denied(String),
}

/// Public facade over parsing, caller loading, and the authorization walk.
///
/// Every failure kind (parse error, unsupported statement, caller profile
/// failure, internal walk error, cancellation, plain denial) collapses to
/// the same denial response. The kind is logged with a statement digest for
/// correlation and never surfaced to the caller.
pub struct QueryGate {
    catalog: Arc<SchemaCatalog>,
    directory: Arc<dyn CallerDirectory>,
    executor: Option<Arc<dyn QueryExecutor>>,
}

impl QueryGate {
    /// Gate that can validate but not execute.
    pub fn new(catalog: Arc<SchemaCatalog>, directory: Arc<dyn CallerDirectory>) -> Self {
        QueryGate {
            catalog,
            directory,
            executor: None,
        }
    }

    /// Gate that can also execute validated statements.
    pub fn with_executor(
        catalog: Arc<SchemaCatalog>,
        directory: Arc<dyn CallerDirectory>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        QueryGate {
            catalog,
            directory,
            executor: Some(executor),
        }
    }

    /// Decide whether `sql` may run for the session's caller.
    pub async fn validate(
        &self,
        sql: &str,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Verdict {
        let cleaned = clean_sql(sql);
        let digest = statement_digest(&cleaned);
        match self.decide(&cleaned, session, cancel).await {
            Ok(true) => Verdict::allowed(),
            Ok(false) => {
                tracing::info!(
                    role = %session.role,
                    user = session.user_id,
                    digest,
                    "select denied"
                );
                Verdict::denied()
            }
            Err(err) => {
                tracing::warn!(
                    kind = %err,
                    role = %session.role,
                    user = session.user_id,
                    digest,
                    "select rejected"
                );
                Verdict::denied()
            }
        }
    }

    /// Validate, then run the statement read-only.
    pub async fn execute(
        &self,
        sql: &str,
        session: &Session,
        cancel: &CancellationToken,
    ) -> ExecuteOutcome {
        let verdict = self.validate(sql, session, cancel).await;
        if !verdict.authorized {
            return ExecuteOutcome::Denied(
                verdict.message.unwrap_or_else(|| DENIED_MESSAGE.to_string()),
            );
        }
        let Some(executor) = self.executor.as_ref() else {
            tracing::warn!("execute called on a gate without an executor");
            return ExecuteOutcome::Denied(DENIED_MESSAGE.to_string());
        };
        match executor.run_select(&clean_sql(sql)).await {
            Ok(output) => ExecuteOutcome::Rows(output),
            Err(err) => {
                tracing::error!(kind = %err, "query execution failed");
                ExecuteOutcome::Denied(DENIED_MESSAGE.to_string())
            }
        }
    }

    async fn decide(
        &self,
        sql: &str,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<bool, GateError> {
        let query = parse_select(sql)?;

        // Warm the column cache for every referenced relation up front so
        // the walk itself never touches the database.
        let referenced = referenced_relations(&query);
        self.catalog.warm(&referenced).await;

        let caller = self.directory.load(session.role, session.user_id).await?;
        let walker = NodeAuthorizer::with_cancellation(&self.catalog, &caller, cancel.clone());
        let result = walker.authorize_query(&query, RelationMap::new(), false)?;
        Ok(result.authorized)
    }
}

fn statement_digest(sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    hasher.finish()
}
