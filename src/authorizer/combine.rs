use crate::relation::RelationMap;

/// Per-alias verdict collected from the branch maps before any mutation.
///
/// Reading first and applying second keeps the pass safe when a branch map
/// shares relation handles with the destination.
enum Verdict {
    Base {
        unauthorized: bool,
    },
    Virtual {
        components: Vec<(String, bool)>,
    },
}

/// How a branch that never saw a relation counts during intersection.
#[derive(Clone, Copy, PartialEq)]
pub enum MissingBranch {
    /// The branch contributes nothing for that relation. Used when folding
    /// joins: a relation joined in later must stay unauthorized until a
    /// predicate credits it.
    Ignored,
    /// The branch counts as having authorized the relation. Used for
    /// INTERSECT: a side that never exposes the relation cannot hold it
    /// unauthorized, a surviving row must appear on both sides.
    Authorizes,
}

/// Union update: a destination relation stays unauthorized when any branch
/// still reports it unauthorized.
///
/// Used for OR operands and UNION sides: every branch may contribute rows,
/// so every branch must have authorized the relation on its own. A branch
/// that never saw the relation contributes nothing.
pub fn update_by_union(dst: &mut RelationMap, branches: &[&RelationMap]) {
    if branches.is_empty() {
        return;
    }
    let verdicts = collect(dst, branches, CombineMode::Union);
    apply(dst, verdicts);
}

/// Intersection update: a destination relation stays unauthorized only when
/// every branch still reports it unauthorized.
///
/// Used for AND operands, INTERSECT sides, and inner joins: a row must
/// satisfy every branch, so one authorizing branch suffices.
pub fn update_by_intersection(
    dst: &mut RelationMap,
    branches: &[&RelationMap],
    missing: MissingBranch,
) {
    if branches.is_empty() {
        return;
    }
    let verdicts = collect(dst, branches, CombineMode::Intersection(missing));
    apply(dst, verdicts);
}

#[derive(Clone, Copy, PartialEq)]
enum CombineMode {
    Union,
    Intersection(MissingBranch),
}

fn collect(dst: &RelationMap, branches: &[&RelationMap], mode: CombineMode) -> Vec<(String, Verdict)> {
    let mut verdicts = Vec::new();

    for (alias, handle) in dst.iter() {
        let relation = handle.borrow();
        if relation.is_database {
            // Union: unauthorized in any branch. Intersection: authorized in
            // any branch.
            let mut unauthorized = false;
            let mut authorized = false;
            let mut seen = false;
            for branch in branches {
                match branch.get(alias) {
                    Some(entry) => {
                        let flag = entry.borrow().authorized;
                        unauthorized |= !flag;
                        authorized |= flag;
                        seen = true;
                    }
                    None => match mode {
                        CombineMode::Union => {
                            tracing::warn!(alias, "relation missing from union branch");
                        }
                        CombineMode::Intersection(MissingBranch::Ignored) => {
                            tracing::debug!(alias, "relation missing from intersection branch");
                        }
                        CombineMode::Intersection(MissingBranch::Authorizes) => {
                            tracing::warn!(alias, "relation missing from intersection branch");
                            authorized = true;
                        }
                    },
                }
            }
            let unauthorized = match mode {
                CombineMode::Union => unauthorized,
                // No branch saw the relation at all: keep its current state.
                CombineMode::Intersection(MissingBranch::Ignored) if !seen => {
                    !relation.authorized
                }
                CombineMode::Intersection(_) => !authorized,
            };
            verdicts.push((alias.to_string(), Verdict::Base { unauthorized }));
        } else {
            let mut components = Vec::new();
            for (component_alias, _) in &relation.unauthorized {
                let mut unauthorized = false;
                let mut authorized = false;
                for branch in branches {
                    let Some(entry) = branch.get(alias) else {
                        match mode {
                            CombineMode::Union => {
                                tracing::warn!(alias, "relation missing from union branch");
                            }
                            CombineMode::Intersection(MissingBranch::Ignored) => {
                                tracing::debug!(alias, "relation missing from intersection branch");
                            }
                            CombineMode::Intersection(MissingBranch::Authorizes) => {
                                tracing::warn!(alias, "relation missing from intersection branch");
                                authorized = true;
                            }
                        }
                        continue;
                    };
                    let entry = entry.borrow();
                    match entry.unauthorized_component(component_alias) {
                        Some(component) => {
                            let flag = component.borrow().authorized;
                            unauthorized |= !flag;
                            authorized |= flag;
                        }
                        // Absent from this branch's unauthorized set means
                        // the branch authorized it.
                        None => authorized = true,
                    }
                }
                let unauthorized = match mode {
                    CombineMode::Union => unauthorized,
                    CombineMode::Intersection(_) => !authorized,
                };
                components.push((component_alias.clone(), unauthorized));
            }
            verdicts.push((alias.to_string(), Verdict::Virtual { components }));
        }
    }

    verdicts
}

fn apply(dst: &mut RelationMap, verdicts: Vec<(String, Verdict)>) {
    for (alias, verdict) in verdicts {
        let Some(handle) = dst.get(&alias) else {
            continue;
        };
        let mut relation = handle.borrow_mut();
        match verdict {
            Verdict::Base { unauthorized } => {
                relation.authorized = !unauthorized;
            }
            Verdict::Virtual { components } => {
                for (component_alias, unauthorized) in components {
                    if !unauthorized {
                        relation.remove_unauthorized(&component_alias);
                    }
                }
                if relation.unauthorized.is_empty() {
                    relation.authorized = true;
                }
            }
        }
    }
}
