use crate::caller::CallerContext;

/// Tables every caller may read without row constraints.
pub const PUBLIC_TABLES: [&str; 8] = [
    "program",
    "semester",
    "course",
    "course_program",
    "course_class",
    "course_class_schedule",
    "course_schedule_instructor",
    "faculty",
];

/// True when `name` is readable by every caller.
pub fn is_public_table(name: &str) -> bool {
    PUBLIC_TABLES.contains(&name)
}

/// Authorization recipe for one (base table, caller) pair.
///
/// `bypass` authorizes the table unconditionally. Otherwise a predicate of
/// the form `col = v` or `col IN (v)` suffices when `col` is one of the
/// authorizing columns and `v` is among its allowed values. An empty context
/// means no predicate can authorize the table for this caller.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationContext {
    /// Table is authorized unconditionally.
    pub bypass: bool,
    /// Columns whose equality to an allowed value authorizes the table.
    pub authorizing_columns: Vec<String>,
    /// Allowed integer values per authorizing column, in declaration order.
    pub conditions: Vec<(String, Vec<i32>)>,
}

impl AuthorizationContext {
    fn unconditional() -> Self {
        AuthorizationContext {
            bypass: true,
            ..AuthorizationContext::default()
        }
    }

    fn with_condition(column: &str, values: Vec<i32>) -> Self {
        let mut context = AuthorizationContext::default();
        context.push_condition(column, values);
        context
    }

    fn push_condition(&mut self, column: &str, values: Vec<i32>) {
        self.authorizing_columns.push(column.to_string());
        self.conditions.push((column.to_string(), values));
    }

    /// True when `column` can authorize the table.
    pub fn is_authorizing_column(&self, column: &str) -> bool {
        self.authorizing_columns.iter().any(|c| c == column)
    }

    /// Allowed values for `column`; empty when the column does not authorize.
    pub fn allowed_values(&self, column: &str) -> &[i32] {
        self.conditions
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

/// The tenancy rule for `table` as seen by `caller`.
///
/// Admins bypass everything, public tables bypass for every caller, and the
/// remaining rules constrain each restricted table to the caller's own slice.
/// Unlisted (table, role) pairs return the empty context: no predicate can
/// authorize them, so a query touching them is denied.
pub fn authorization_context(table: &str, caller: &CallerContext) -> AuthorizationContext {
    if caller.is_admin() {
        return AuthorizationContext::unconditional();
    }
    if is_public_table(table) {
        return AuthorizationContext::unconditional();
    }

    match caller {
        CallerContext::Admin { .. } => AuthorizationContext::unconditional(),
        CallerContext::Student(profile) => match table {
            "student" => AuthorizationContext::with_condition("id", vec![profile.id]),
            "administrative_class" => {
                AuthorizationContext::with_condition("id", vec![profile.administrative_class_id])
            }
            "course_class_enrollment" | "student_course_class_schedule" | "student_scholarship" => {
                AuthorizationContext::with_condition("student_id", vec![profile.id])
            }
            "professor" => {
                let mut ids = profile.course_instructor_ids.clone();
                ids.push(profile.advisor_professor_id);
                AuthorizationContext::with_condition("id", ids)
            }
            _ => AuthorizationContext::default(),
        },
        CallerContext::Professor(profile) => match table {
            "professor" => AuthorizationContext::with_condition("id", vec![profile.id]),
            "administrative_class" => {
                let mut context =
                    AuthorizationContext::with_condition("advisor_id", vec![profile.id]);
                context.push_condition("id", profile.advised_class_ids.clone());
                context
            }
            "course_class_enrollment" | "student_course_class_schedule" => {
                let mut context = AuthorizationContext::with_condition(
                    "course_class_id",
                    profile.taught_course_class_ids.clone(),
                );
                context.push_condition("student_id", profile.advised_student_ids.clone());
                context
            }
            "student" => {
                AuthorizationContext::with_condition("id", profile.taught_student_ids.clone())
            }
            _ => AuthorizationContext::default(),
        },
    }
}
