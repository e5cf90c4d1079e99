//! Row-level authorization for `PostgreSQL` SELECT queries.
//!
//! Given a SELECT statement synthesized by a chatbot and the authenticated
//! caller, the gate decides whether the caller is permitted to see every row
//! the statement could return. The walker tracks which base tables each
//! logical relation is composed of (through joins, set operations,
//! subselects, and CTEs) and only admits the statement once every restricted
//! table is constrained to the caller's own rows by a predicate.
#![warn(missing_docs)]

/// The recursive AST walker that decides authorization.
pub mod authorizer;
/// Caller identity: roles, profiles, and the directory seam that loads them.
pub mod caller;
/// Schema column cache and the `PostgreSQL`-backed catalog.
pub mod catalog;
/// Failure taxonomy shared across the crate.
pub mod error;
/// Public facade: validation and read-only execution.
pub mod gate;
/// SQL parsing front door and AST extraction helpers.
pub mod parser;
/// Tenancy rules: which predicates authorize which tables for which caller.
pub mod policy;
/// The relation graph: base and virtual relations with ordered columns.
pub mod relation;
