use std::collections::BTreeSet;
use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations, Query};

use crate::parser::names::relation_name;

/// Every relation name referenced anywhere in the statement, deduplicated
/// and normalized.
///
/// Covers FROM items, joins, subselects, CTE bodies, and sublinks inside
/// predicates. CTE names referenced as relations are included too; the
/// catalog simply has no columns for them, which is the fail-closed default.
pub fn referenced_relations(query: &Query) -> Vec<String> {
    let mut names = BTreeSet::new();
    let _ = visit_relations(query, |relation| {
        names.insert(relation_name(relation));
        ControlFlow::<()>::Continue(())
    });
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sql_parser::parse_select;

    #[test]
    fn referenced_relations_reaches_subselects_and_ctes() {
        let query = parse_select(
            "WITH mine AS (SELECT id FROM course_class_enrollment WHERE student_id = 1) \
             SELECT c.name FROM course c \
             JOIN (SELECT * FROM course_class) cc ON cc.course_id = c.id \
             WHERE c.id IN (SELECT id FROM mine)",
        )
        .expect("query should parse");

        let names = referenced_relations(&query);
        assert!(names.contains(&"course".to_string()));
        assert!(names.contains(&"course_class".to_string()));
        assert!(names.contains(&"course_class_enrollment".to_string()));
        assert!(names.contains(&"mine".to_string()));
    }
}
