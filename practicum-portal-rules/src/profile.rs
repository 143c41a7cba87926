use itertools::Itertools as _;
use serde::Serialize;

use crate::eligibility::Eligibility;

/// The verified student card shown in the page header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentProfile {
    pub initials: String,
    pub name: String,
    pub student_id: String,
    pub gpa: String,
    pub microteaching_grade: String,
}

#[must_use]
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .join("")
}

impl From<&Eligibility> for StudentProfile {
    fn from(eligibility: &Eligibility) -> Self {
        Self {
            initials: initials(&eligibility.name),
            name: eligibility.name.clone(),
            student_id: eligibility.student_id.clone(),
            gpa: format!("{:.2}", eligibility.gpa),
            microteaching_grade: eligibility.microteaching_grade.clone(),
        }
    }
}
