use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::GateError;

/// Source of base-table column metadata, usually the live catalog.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Ordered column names for `table`; empty when the table is unknown.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, GateError>;
}

/// Process-wide cache of base-table column lists.
///
/// Entries are added on first use and never invalidated for the process
/// lifetime; reads dominate writes. The authorization walk itself never
/// suspends: the gate warms the cache with every relation name the statement
/// references before the walk starts, so `columns_of` is a plain cache read.
pub struct SchemaCatalog {
    columns: RwLock<HashMap<String, Arc<[String]>>>,
    source: Option<Arc<dyn SchemaSource>>,
}

impl SchemaCatalog {
    /// Catalog backed by a live schema source.
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        SchemaCatalog {
            columns: RwLock::new(HashMap::new()),
            source: Some(source),
        }
    }

    /// Catalog with no backing source; columns come from `preload` only.
    pub fn empty() -> Self {
        SchemaCatalog {
            columns: RwLock::new(HashMap::new()),
            source: None,
        }
    }

    /// Ordered column names for `table`.
    ///
    /// Unknown tables yield an empty list; any authorization attempt that
    /// depends on their columns then fails closed.
    pub fn columns_of(&self, table: &str) -> Arc<[String]> {
        self.columns
            .read()
            .get(table)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Fetch and cache column lists for every name missing from the cache.
    ///
    /// Lookup failures are logged and leave the entry absent, so the table
    /// stays unknown (and the query denied) rather than poisoning the cache.
    pub async fn warm(&self, tables: &[String]) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        for table in tables {
            if self.columns.read().contains_key(table) {
                continue;
            }
            match source.table_columns(table).await {
                Ok(columns) if !columns.is_empty() => {
                    self.columns
                        .write()
                        .insert(table.clone(), Arc::from(columns));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "schema lookup failed");
                }
            }
        }
    }

    /// Seed the cache directly. Used by fixtures and static schemas.
    pub fn preload(&self, table: &str, columns: &[&str]) {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.columns
            .write()
            .insert(table.to_string(), Arc::from(columns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSource {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SchemaSource for CountingSource {
        async fn table_columns(&self, table: &str) -> Result<Vec<String>, GateError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match table {
                "student" => Ok(vec!["id".to_string(), "name".to_string()]),
                _ => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn unknown_tables_yield_the_empty_list() {
        let catalog = SchemaCatalog::empty();
        assert!(catalog.columns_of("student").is_empty());

        catalog.preload("student", &["id", "name"]);
        assert_eq!(&*catalog.columns_of("student"), ["id", "name"]);
    }

    #[tokio::test]
    async fn warm_fetches_misses_once_and_skips_unknown_tables() {
        let source = Arc::new(CountingSource {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let catalog = SchemaCatalog::new(source.clone());

        let tables = vec!["student".to_string(), "mystery".to_string()];
        catalog.warm(&tables).await;
        catalog.warm(&tables).await;

        assert_eq!(&*catalog.columns_of("student"), ["id", "name"]);
        assert!(catalog.columns_of("mystery").is_empty());
        // student cached after the first pass; mystery retried each time.
        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
