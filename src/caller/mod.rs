use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Caller roles known to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrestricted access to every table.
    Admin,
    /// A student; sees their own records and public tables.
    Student,
    /// A professor; sees advised and taught records and public tables.
    Professor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Student => write!(f, "student"),
            Role::Professor => write!(f, "professor"),
        }
    }
}

impl FromStr for Role {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "professor" => Ok(Role::Professor),
            other => Err(GateError::Policy(format!("unknown role: {other}"))),
        }
    }
}

/// Identity facts backing student tenancy decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentProfile {
    /// Student id.
    pub id: i32,
    /// The student's administrative class.
    pub administrative_class_id: i32,
    /// Course classes the student is enrolled in.
    pub enrolled_course_class_ids: Vec<i32>,
    /// Schedule rows behind those enrollments.
    pub enrolled_schedule_ids: Vec<i32>,
    /// Advisor of the student's administrative class.
    pub advisor_professor_id: i32,
    /// Professors instructing the student's course classes.
    pub course_instructor_ids: Vec<i32>,
}

/// Identity facts backing professor tenancy decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfessorProfile {
    /// Professor id.
    pub id: i32,
    /// Administrative classes the professor advises.
    pub advised_class_ids: Vec<i32>,
    /// Course classes the professor teaches.
    pub taught_course_class_ids: Vec<i32>,
    /// Schedule rows for taught course classes.
    pub taught_schedule_ids: Vec<i32>,
    /// Students in the professor's advised classes.
    pub advised_student_ids: Vec<i32>,
    /// Students enrolled in the professor's course classes.
    pub taught_student_ids: Vec<i32>,
}

/// The authenticated caller, loaded once per request and read-only during
/// the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerContext {
    /// Administrator; bypasses every table policy.
    Admin {
        /// User id.
        id: i32,
    },
    /// Student with their tenancy facts.
    Student(StudentProfile),
    /// Professor with their tenancy facts.
    Professor(ProfessorProfile),
}

impl CallerContext {
    /// The caller's role.
    pub fn role(&self) -> Role {
        match self {
            CallerContext::Admin { .. } => Role::Admin,
            CallerContext::Student(_) => Role::Student,
            CallerContext::Professor(_) => Role::Professor,
        }
    }

    /// The caller's user id.
    pub fn id(&self) -> i32 {
        match self {
            CallerContext::Admin { id } => *id,
            CallerContext::Student(profile) => profile.id,
            CallerContext::Professor(profile) => profile.id,
        }
    }

    /// True for administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, CallerContext::Admin { .. })
    }
}

/// Loads caller profiles from the catalog.
///
/// The Postgres implementation issues the role-specific queries concurrently
/// and joins them; any failure fails closed at the gate.
#[async_trait]
pub trait CallerDirectory: Send + Sync {
    /// Load the profile for `role` / `user_id`.
    async fn load(&self, role: Role, user_id: i32) -> Result<CallerContext, GateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for (text, role) in [
            ("admin", Role::Admin),
            ("Student", Role::Student),
            ("PROFESSOR", Role::Professor),
        ] {
            assert_eq!(text.parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::Student.to_string(), "student");
        assert!(matches!(
            "registrar".parse::<Role>(),
            Err(GateError::Policy(_))
        ));
    }
}
