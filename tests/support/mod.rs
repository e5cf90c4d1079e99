#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use rowgate::authorizer::NodeAuthorizer;
use rowgate::caller::{
    CallerContext, CallerDirectory, ProfessorProfile, Role, StudentProfile,
};
use rowgate::catalog::SchemaCatalog;
use rowgate::error::GateError;
use rowgate::parser::sql_parser::{clean_sql, parse_select};
use rowgate::relation::RelationMap;

/// Schema catalog mirroring the university tables the policies cover.
pub fn fixture_catalog() -> SchemaCatalog {
    let catalog = SchemaCatalog::empty();
    catalog.preload(
        "student",
        &[
            "id",
            "code",
            "name",
            "gender",
            "birthday",
            "email",
            "administrative_class_id",
        ],
    );
    catalog.preload(
        "professor",
        &["id", "name", "email", "academic_rank", "degree", "department_id"],
    );
    catalog.preload(
        "course",
        &[
            "id",
            "code",
            "name",
            "english_name",
            "credits",
            "practice_hours",
            "theory_hours",
            "self_learn_hours",
            "prerequisite",
        ],
    );
    catalog.preload("administrative_class", &["id", "name", "program_id", "advisor_id"]);
    catalog.preload(
        "course_class_enrollment",
        &["id", "student_id", "course_class_id", "grade"],
    );
    catalog.preload("course_class", &["id", "course_id", "semester_id", "name"]);
    catalog.preload(
        "course_class_schedule",
        &["id", "course_class_id", "day_of_week", "start_period", "end_period"],
    );
    catalog.preload(
        "course_schedule_instructor",
        &["id", "course_class_schedule_id", "professor_id"],
    );
    catalog.preload(
        "student_course_class_schedule",
        &[
            "id",
            "student_id",
            "course_class_enrollment_id",
            "course_class_schedule_id",
        ],
    );
    catalog.preload(
        "student_scholarship",
        &["id", "student_id", "scholarship_id", "semester_id"],
    );
    catalog.preload("semester", &["id", "name", "start_date", "end_date"]);
    catalog.preload("program", &["id", "name", "faculty_id"]);
    catalog.preload("faculty", &["id", "name"]);
    catalog.preload("course_program", &["id", "course_id", "program_id"]);
    catalog
}

pub fn admin() -> CallerContext {
    CallerContext::Admin { id: 1 }
}

/// Student with a populated profile: class 7, advisor 42, instructors 51/52.
pub fn student(id: i32) -> CallerContext {
    CallerContext::Student(StudentProfile {
        id,
        administrative_class_id: 7,
        enrolled_course_class_ids: vec![10, 11],
        enrolled_schedule_ids: vec![100, 101],
        advisor_professor_id: 42,
        course_instructor_ids: vec![51, 52],
    })
}

/// Professor teaching the given course classes, advising class 7 and
/// students 123/124.
pub fn professor(id: i32, taught_course_class_ids: Vec<i32>) -> CallerContext {
    CallerContext::Professor(ProfessorProfile {
        id,
        advised_class_ids: vec![7],
        taught_course_class_ids,
        taught_schedule_ids: vec![100],
        advised_student_ids: vec![123],
        taught_student_ids: vec![123, 124],
    })
}

/// Parse and walk `sql` for `caller` against the fixture schema.
pub fn try_authorize(caller: &CallerContext, sql: &str) -> Result<bool, GateError> {
    let catalog = fixture_catalog();
    let query = parse_select(&clean_sql(sql))?;
    let walker = NodeAuthorizer::new(&catalog, caller);
    Ok(walker
        .authorize_query(&query, RelationMap::new(), false)?
        .authorized)
}

/// Like `try_authorize`, but any failure counts as a denial, the way the
/// gate reports it.
pub fn authorize(caller: &CallerContext, sql: &str) -> bool {
    try_authorize(caller, sql).unwrap_or(false)
}

/// In-memory caller directory for gate-level tests.
pub struct StaticDirectory;

#[async_trait]
impl CallerDirectory for StaticDirectory {
    async fn load(&self, role: Role, user_id: i32) -> Result<CallerContext, GateError> {
        Ok(match role {
            Role::Admin => CallerContext::Admin { id: user_id },
            Role::Student => student(user_id),
            Role::Professor => professor(user_id, vec![10]),
        })
    }
}

/// Fixture catalog wrapped for gate construction.
pub fn gate_catalog() -> Arc<SchemaCatalog> {
    Arc::new(fixture_catalog())
}
