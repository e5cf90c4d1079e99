use crate::relation::model::RelationHandle;

/// Insertion-ordered alias-to-relation map for one query scope.
///
/// Scopes are small (a handful of FROM items), so entries live in a vector
/// and lookups scan it. Order is load-bearing: positional column renaming of
/// `SELECT * FROM (...) AS v(a, b, c)` depends on it surviving merges and
/// clones.
#[derive(Debug, Default, Clone)]
pub struct RelationMap {
    entries: Vec<(String, RelationHandle)>,
}

impl RelationMap {
    /// Empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope holding a single relation.
    pub fn singleton(alias: &str, handle: RelationHandle) -> Self {
        let mut map = Self::new();
        map.insert(alias, handle);
        map
    }

    /// Number of relations in the scope.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the scope holds no relations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace under `alias`, preserving first-insertion order.
    pub fn insert(&mut self, alias: &str, handle: RelationHandle) {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == alias) {
            entry.1 = handle;
        } else {
            self.entries.push((alias.to_string(), handle));
        }
    }

    /// Relation under `alias`, if any.
    pub fn get(&self, alias: &str) -> Option<&RelationHandle> {
        self.entries
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, handle)| handle)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationHandle)> {
        self.entries
            .iter()
            .map(|(alias, handle)| (alias.as_str(), handle))
    }

    /// Merge `src` into `self`; duplicate aliases take the incoming handle.
    pub fn merge_from(&mut self, src: &RelationMap) {
        for (alias, handle) in src.iter() {
            self.insert(alias, handle.clone());
        }
    }

    /// Deep-copy every relation in the scope.
    ///
    /// Taken before any branch that may need to back off (boolean operands,
    /// set-operation sides) so predicate credits stay local to the branch.
    pub fn clone_deep(&self) -> RelationMap {
        RelationMap {
            entries: self
                .entries
                .iter()
                .map(|(alias, handle)| (alias.clone(), handle.borrow().clone_deep().into_handle()))
                .collect(),
        }
    }

    /// True when every relation in the scope is authorized: base relations by
    /// their flag, virtual relations by an empty unauthorized set.
    pub fn all_authorized(&self) -> bool {
        self.entries.iter().all(|(_, handle)| {
            let relation = handle.borrow();
            if relation.is_database {
                relation.authorized
            } else {
                relation.unauthorized.is_empty()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::model::Relation;

    fn base(name: &str, authorized: bool) -> RelationHandle {
        Relation::new_base(name, name, authorized, &["id".to_string()]).into_handle()
    }

    #[test]
    fn merge_keeps_insertion_order_and_overwrites_duplicates() {
        let mut left = RelationMap::new();
        left.insert("a", base("a", false));
        left.insert("b", base("b", false));

        let mut right = RelationMap::new();
        let replacement = base("b", true);
        right.insert("b", replacement.clone());
        right.insert("c", base("c", false));

        left.merge_from(&right);
        let aliases: Vec<&str> = left.iter().map(|(alias, _)| alias).collect();
        assert_eq!(aliases, vec!["a", "b", "c"]);
        assert!(left.get("b").unwrap().borrow().authorized);
    }

    #[test]
    fn all_authorized_distinguishes_base_and_virtual_relations() {
        let mut map = RelationMap::new();
        map.insert("a", base("a", true));
        assert!(map.all_authorized());

        let mut wrapper = Relation {
            name: "v".to_string(),
            alias: "v".to_string(),
            ..Relation::default()
        };
        wrapper.set_unauthorized("a", base("a", false));
        map.insert("v", wrapper.into_handle());
        assert!(!map.all_authorized());
    }

    #[test]
    fn clone_deep_isolates_branch_mutations() {
        let mut map = RelationMap::new();
        map.insert("student", base("student", false));

        let branch = map.clone_deep();
        branch.get("student").unwrap().borrow_mut().authorized = true;
        assert!(!map.get("student").unwrap().borrow().authorized);
    }
}
