mod support;

use support::{authorize, student, try_authorize};

#[test]
fn and_credits_when_either_operand_authorizes() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE id = 123 AND name = 'Alice'"
    ));
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE gender = 'F' AND id = 123"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE name = 'Alice' AND gender = 'F'"
    ));
}

#[test]
fn or_requires_every_operand_to_authorize() {
    let caller = student(123);
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE id = 123 OR name = 'Alice'"
    ));
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE id = 123 OR id = 123"
    ));
}

#[test]
fn long_chains_flatten_into_one_composition() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE name = 'a' AND gender = 'F' AND id = 123"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE id = 123 OR id = 123 OR id = 456"
    ));
}

#[test]
fn nested_parentheses_are_transparent() {
    assert!(authorize(
        &student(123),
        "SELECT * FROM student WHERE ((id = 123))"
    ));
    assert!(authorize(
        &student(123),
        "SELECT * FROM student WHERE (name = 'a' OR gender = 'F') AND id = 123"
    ));
}

#[test]
fn not_toggles_the_operator_the_matcher_wants() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE NOT (id <> 123)"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE NOT (id = 123)"
    ));
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE NOT (NOT (id = 123))"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE NOT (id <> 456)"
    ));
}

#[test]
fn not_in_matches_under_a_single_negation() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM student WHERE NOT (id NOT IN (123))"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE id NOT IN (123)"
    ));
}

#[test]
fn non_equality_comparisons_never_authorize() {
    let caller = student(123);
    for sql in [
        "SELECT * FROM student WHERE id > 122",
        "SELECT * FROM student WHERE id >= 123",
        "SELECT * FROM student WHERE id <> 123",
        "SELECT * FROM student WHERE id + 0 = 123",
    ] {
        assert!(!authorize(&caller, sql), "should deny: {sql}");
    }
}

#[test]
fn constants_match_on_either_side_of_the_equality() {
    assert!(authorize(
        &student(123),
        "SELECT * FROM student WHERE 123 = id"
    ));
}

#[test]
fn qualified_references_must_name_the_relation_in_scope() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM student s WHERE s.id = 123"
    ));
    // A qualifier pointing elsewhere cannot credit the student table.
    assert!(!authorize(
        &caller,
        "SELECT * FROM student s WHERE t.id = 123"
    ));
}

#[test]
fn having_is_consulted_after_where() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT administrative_class_id FROM student \
         GROUP BY administrative_class_id, id HAVING id = 123"
    ));
    assert!(!authorize(
        &caller,
        "SELECT administrative_class_id FROM student \
         GROUP BY administrative_class_id, id HAVING id = 456"
    ));
}

#[test]
fn exists_sublinks_do_not_launder_outer_tables() {
    let caller = student(123);
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE id = 456 AND EXISTS (SELECT 1 FROM course)"
    ));
    assert!(!authorize(
        &caller,
        "SELECT * FROM student WHERE EXISTS (SELECT 1 FROM course) \
         OR EXISTS (SELECT 1 FROM semester)"
    ));
}

#[test]
fn row_and_sublink_comparison_credits_the_tied_relation() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT * FROM course_class_enrollment e \
         WHERE (e.student_id, e.grade) = \
           (SELECT student_id, grade FROM course_class_enrollment \
            WHERE student_id = 123)"
    ));
    // The inner subselect is not itself authorized, so nothing is credited.
    assert!(!authorize(
        &caller,
        "SELECT * FROM course_class_enrollment e \
         WHERE (e.student_id, e.grade) = \
           (SELECT student_id, grade FROM course_class_enrollment \
            WHERE student_id = 456)"
    ));
    // The tied column must be an authorizing column of its source table.
    assert!(!authorize(
        &caller,
        "SELECT * FROM course_class_enrollment e \
         WHERE (e.grade, e.course_class_id) = \
           (SELECT grade, course_class_id FROM course_class_enrollment \
            WHERE student_id = 123)"
    ));
}

#[test]
fn unknown_predicate_shapes_fail_closed_without_erroring() {
    let caller = student(123);
    assert_eq!(
        try_authorize(&caller, "SELECT * FROM student WHERE id IS NULL").ok(),
        Some(false)
    );
    assert_eq!(
        try_authorize(
            &caller,
            "SELECT * FROM student WHERE length(name) = 123"
        )
        .ok(),
        Some(false)
    );
}
