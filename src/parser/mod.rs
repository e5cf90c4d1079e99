/// Column-reference and integer-constant extraction from expressions.
pub mod expr;
/// Identifier and table-name normalization helpers (schema-qualified names, quoted identifiers).
pub mod names;
/// Parsing of raw SQL text into a single SELECT statement.
pub mod sql_parser;
/// Collection of every relation name a statement references.
pub mod tables;
