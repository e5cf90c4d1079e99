/// `PostgreSQL`-backed schema source, caller directory, and executor.
pub mod postgres;
/// Process-wide, append-only cache of base-table column lists.
pub mod schema;

pub use postgres::{DatabaseConfig, PgCatalog};
pub use schema::{SchemaCatalog, SchemaSource};
