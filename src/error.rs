use thiserror::Error;

/// The single opaque message shown to the caller for every denial.
///
/// Distinguishing "parse error" from "denied" would leak attacker-useful
/// information, so every failure kind collapses to this string at the gate
/// boundary. The underlying kind is only logged.
pub const DENIED_MESSAGE: &str = "Sorry, you do not have access to this data.";

/// Failure kinds raised while validating or executing a query.
#[derive(Debug, Error)]
pub enum GateError {
    /// Input is not valid SQL.
    #[error("failed to parse SQL: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),
    /// Parsed input is not a single SELECT statement.
    #[error("statement is not a plain SELECT")]
    UnsupportedStatement,
    /// The caller profile could not be loaded from the catalog.
    #[error("caller profile unavailable: {0}")]
    Policy(String),
    /// Malformed query structure reached the walker.
    #[error("malformed query structure: {0}")]
    InternalWalk(String),
    /// The request was cancelled mid-walk.
    #[error("query cancelled")]
    Cancelled,
    /// Database access failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<tokio_postgres::Error> for GateError {
    fn from(err: tokio_postgres::Error) -> Self {
        GateError::Database(err.to_string())
    }
}
