mod support;

use support::{authorize, student};

#[test]
fn union_requires_both_sides_to_authorize() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT id FROM student WHERE id = 123 \
         UNION SELECT id FROM student WHERE id = 123"
    ));
    assert!(!authorize(
        &caller,
        "SELECT id FROM student WHERE id = 123 \
         UNION SELECT id FROM student"
    ));
    assert!(!authorize(
        &caller,
        "SELECT id FROM student \
         UNION SELECT id FROM student WHERE id = 123"
    ));
}

#[test]
fn union_all_behaves_like_union() {
    assert!(!authorize(
        &student(123),
        "SELECT id FROM student WHERE id = 123 \
         UNION ALL SELECT id FROM student"
    ));
}

#[test]
fn intersect_accepts_one_authorized_side() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT id FROM student \
         INTERSECT SELECT id FROM student WHERE id = 123"
    ));
    assert!(authorize(
        &caller,
        "SELECT id FROM student WHERE id = 123 \
         INTERSECT SELECT id FROM student"
    ));
    assert!(!authorize(
        &caller,
        "SELECT id FROM student INTERSECT SELECT id FROM student"
    ));
}

#[test]
fn except_only_credits_the_left_side() {
    let caller = student(123);
    assert!(authorize(
        &caller,
        "SELECT id FROM student WHERE id = 123 \
         EXCEPT SELECT id FROM student"
    ));
    // Filtering done by the right side is never credited.
    assert!(!authorize(
        &caller,
        "SELECT id FROM student \
         EXCEPT SELECT id FROM student WHERE id = 456"
    ));
}

#[test]
fn set_operations_over_public_tables_are_free() {
    assert!(authorize(
        &student(123),
        "SELECT id FROM course UNION SELECT id FROM semester \
         INTERSECT SELECT id FROM program"
    ));
}

#[test]
fn authorized_union_wrapped_in_an_alias_is_allowed() {
    assert!(authorize(
        &student(123),
        "SELECT * FROM (SELECT s.id FROM student s WHERE s.id = 123 \
                        UNION SELECT s.id FROM student s WHERE s.id = 123) v"
    ));
}
