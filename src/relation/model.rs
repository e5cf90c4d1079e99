use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;

/// Shared handle to a relation in the per-query graph.
///
/// Relations are referenced from multiple places at once: the scope map, the
/// unauthorized-component sets of enclosing virtual relations, and column
/// source back-pointers. The graph lives for a single query walk.
pub type RelationHandle = Rc<RefCell<Relation>>;

/// A column visible through a relation, bound to where it comes from.
#[derive(Debug, Clone)]
pub struct ColumnBinding {
    /// Name of the column inside its source relation. For a virtual relation
    /// this is the source's outward-facing alias for the column.
    pub name: String,
    /// Source relation. `None` means the relation owning this binding (the
    /// base-table case); a handle points into an inner scope.
    pub source: Option<RelationHandle>,
}

/// A named logical relation in a query: a base table, an aliased base table,
/// a join result, a subselect, or a CTE.
#[derive(Debug, Default)]
pub struct Relation {
    /// Base-table name when `is_database`, otherwise the virtual alias.
    pub name: String,
    /// Visible name in the enclosing scope (equals `name` unless aliased).
    pub alias: String,
    /// True iff this relation corresponds directly to a catalog table.
    pub is_database: bool,
    /// For a base relation, set by policy at creation; for a virtual relation
    /// this must track `unauthorized.is_empty()`.
    pub authorized: bool,
    /// Ordered outward column alias to binding. Order matches projection
    /// order and drives positional column renaming.
    pub columns: Vec<(String, ColumnBinding)>,
    /// Ordered alias to still-unauthorized component relation.
    pub unauthorized: Vec<(String, RelationHandle)>,
}

/// A column alias resolved down to its base-table binding.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    /// Real column name in the base table.
    pub name: String,
    /// The base relation owning the column.
    pub source: RelationHandle,
}

impl Relation {
    /// Construct a base relation with columns from the catalog.
    ///
    /// Columns are bound to the relation itself (`source: None`), so alias
    /// resolution terminates here.
    pub fn new_base(name: &str, alias: &str, authorized: bool, columns: &[String]) -> Relation {
        Relation {
            name: name.to_string(),
            alias: alias.to_string(),
            is_database: true,
            authorized,
            columns: columns
                .iter()
                .map(|col| {
                    (
                        col.clone(),
                        ColumnBinding {
                            name: col.clone(),
                            source: None,
                        },
                    )
                })
                .collect(),
            unauthorized: Vec::new(),
        }
    }

    /// Wrap the relation in a shared handle.
    pub fn into_handle(self) -> RelationHandle {
        Rc::new(RefCell::new(self))
    }

    /// Look up a column binding by its outward alias.
    pub fn column(&self, alias: &str) -> Option<&ColumnBinding> {
        self.columns
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, binding)| binding)
    }

    /// Insert or replace a column binding, preserving first-insertion order.
    pub fn set_column(&mut self, alias: &str, binding: ColumnBinding) {
        if let Some(entry) = self.columns.iter_mut().find(|(name, _)| name == alias) {
            entry.1 = binding;
        } else {
            self.columns.push((alias.to_string(), binding));
        }
    }

    /// Look up an unauthorized component by alias.
    pub fn unauthorized_component(&self, alias: &str) -> Option<&RelationHandle> {
        self.unauthorized
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, handle)| handle)
    }

    /// Insert or replace an unauthorized component, preserving order.
    pub fn set_unauthorized(&mut self, alias: &str, handle: RelationHandle) {
        if let Some(entry) = self.unauthorized.iter_mut().find(|(name, _)| name == alias) {
            entry.1 = handle;
        } else {
            self.unauthorized.push((alias.to_string(), handle));
        }
    }

    /// Remove an unauthorized component by alias.
    pub fn remove_unauthorized(&mut self, alias: &str) {
        self.unauthorized.retain(|(name, _)| name != alias);
    }

    /// Deep copy.
    ///
    /// Column order is preserved, unauthorized components are cloned
    /// recursively, and column source back-pointers are copied shallowly.
    /// Back-pointers can participate in cycles, so clone never traverses
    /// them; a base clone's own columns stay bound to the clone via `None`.
    pub fn clone_deep(&self) -> Relation {
        Relation {
            name: self.name.clone(),
            alias: self.alias.clone(),
            is_database: self.is_database,
            authorized: self.authorized,
            columns: self
                .columns
                .iter()
                .map(|(alias, binding)| (alias.clone(), binding.clone()))
                .collect(),
            unauthorized: self
                .unauthorized
                .iter()
                .map(|(alias, handle)| (alias.clone(), handle.borrow().clone_deep().into_handle()))
                .collect(),
        }
    }

    /// Structural snapshot for assertions and logging; ignores column source
    /// back-pointers.
    pub fn snapshot(&self) -> RelationSnapshot {
        RelationSnapshot {
            name: self.name.clone(),
            alias: self.alias.clone(),
            is_database: self.is_database,
            authorized: self.authorized,
            columns: self
                .columns
                .iter()
                .map(|(alias, binding)| (alias.clone(), binding.name.clone()))
                .collect(),
            unauthorized: self
                .unauthorized
                .iter()
                .map(|(alias, handle)| (alias.clone(), handle.borrow().snapshot()))
                .collect(),
        }
    }
}

/// Serializable structural view of a relation, without back-pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationSnapshot {
    /// Relation name.
    pub name: String,
    /// Scope alias.
    pub alias: String,
    /// Base-table flag.
    pub is_database: bool,
    /// Authorization flag.
    pub authorized: bool,
    /// Ordered (outward alias, source column name) pairs.
    pub columns: Vec<(String, String)>,
    /// Ordered unauthorized component snapshots.
    pub unauthorized: Vec<(String, RelationSnapshot)>,
}

/// Resolve an outward-facing column alias to its base-table binding.
///
/// Follows `source` links through virtual layers until a base relation is
/// reached. A visited set bounds the walk: aliasing chains are lexical in
/// practice, but a malformed graph must terminate rather than loop. Any
/// missing link resolves to `None`, which callers treat as fail-closed.
pub fn resolve_column(handle: &RelationHandle, alias: &str) -> Option<ResolvedColumn> {
    let mut visited: HashSet<*const RefCell<Relation>> = HashSet::new();
    let mut current = Rc::clone(handle);
    let mut alias = alias.to_string();

    loop {
        if !visited.insert(Rc::as_ptr(&current)) {
            return None;
        }
        let (next_alias, next_source) = {
            let relation = current.borrow();
            if relation.is_database {
                let binding = relation.column(&alias)?;
                return Some(ResolvedColumn {
                    name: binding.name.clone(),
                    source: Rc::clone(&current),
                });
            }
            let binding = relation.column(&alias)?;
            (binding.name.clone(), binding.source.clone())
        };
        current = next_source?;
        alias = next_alias;
    }
}

/// The real base-table column name behind an outward alias, or the empty
/// string when the alias does not resolve.
pub fn real_column_name(handle: &RelationHandle, alias: &str) -> String {
    resolve_column(handle, alias)
        .map(|resolved| resolved.name)
        .unwrap_or_default()
}
