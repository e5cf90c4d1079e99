use sqlparser::ast::{Query, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::GateError;

/// Normalize raw chatbot SQL before parsing.
///
/// Replaces newlines with spaces, collapses runs of whitespace, and trims the
/// ends. Chat models routinely emit statements wrapped across lines.
pub fn clean_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `sql` under the `PostgreSQL` grammar and admit exactly one SELECT.
///
/// Empty input, multi-statement input, and any non-query statement (DML,
/// DDL, CALL, ...) are rejected as unsupported.
pub fn parse_select(sql: &str) -> Result<Query, GateError> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)?;
    if statements.len() != 1 {
        return Err(GateError::UnsupportedStatement);
    }
    match statements.pop() {
        Some(Statement::Query(query)) => Ok(*query),
        _ => Err(GateError::UnsupportedStatement),
    }
}
