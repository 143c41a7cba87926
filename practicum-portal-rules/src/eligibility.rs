use practicum_portal_database::models::Student;
use serde::Serialize;
use tracing::debug;

/// Letter grades of the microteaching course on the 4.0 scale.
pub const GRADE_POINTS: [(&str, f64); 12] = [
    ("A+", 4.0),
    ("A", 4.0),
    ("A-", 3.7),
    ("B+", 3.3),
    ("B", 3.0),
    ("B-", 2.7),
    ("C+", 2.3),
    ("C", 2.0),
    ("C-", 1.7),
    ("D+", 1.3),
    ("D", 1.0),
    ("F", 0.0),
];

/// A "B" or better.
pub const MINIMUM_GRADE_POINTS: f64 = 3.0;

pub const MISSING_GRADE: &str = "N/A";

/// Unknown grades count as 0.
#[must_use]
pub fn grade_points(grade: &str) -> f64 {
    GRADE_POINTS
        .iter()
        .find(|(letter, _)| *letter == grade)
        .map_or(0.0, |(_, points)| *points)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Eligibility {
    pub student_id: String,
    pub name: String,
    pub has_microteaching: bool,
    pub microteaching_grade: String,
    pub grade_points: f64,
    pub meets_grade: bool,
    pub gpa: f64,
    pub eligible: bool,
}

impl Eligibility {
    #[must_use]
    pub fn assess(student: &Student) -> Self {
        let grade_points = student.microteaching_grade.as_deref().map_or(0.0, grade_points);
        let meets_grade = grade_points >= MINIMUM_GRADE_POINTS;
        let eligible = student.has_microteaching && meets_grade;
        debug!(
            student_id = %student.student_id,
            grade_points,
            eligible,
            "assessed eligibility"
        );
        Self {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            has_microteaching: student.has_microteaching,
            microteaching_grade: student
                .microteaching_grade
                .clone()
                .unwrap_or_else(|| MISSING_GRADE.to_owned()),
            grade_points,
            meets_grade,
            gpa: student.gpa,
            eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(has_microteaching: bool, grade: Option<&str>) -> Student {
        Student {
            id: 1,
            student_id: "2021001".to_owned(),
            user_id: None,
            name: "Budi Santoso".to_owned(),
            has_microteaching,
            microteaching_grade: grade.map(ToOwned::to_owned),
            gpa: 3.2,
        }
    }

    #[test]
    fn grade_table_converts_exactly() {
        let expected = [
            ("A+", 4.0),
            ("A", 4.0),
            ("A-", 3.7),
            ("B+", 3.3),
            ("B", 3.0),
            ("B-", 2.7),
            ("C+", 2.3),
            ("C", 2.0),
            ("C-", 1.7),
            ("D+", 1.3),
            ("D", 1.0),
            ("F", 0.0),
        ];
        for (grade, points) in expected {
            assert!((grade_points(grade) - points).abs() < f64::EPSILON, "{grade}");
        }
    }

    #[test]
    fn unknown_grades_are_zero() {
        assert!(grade_points("E").abs() < f64::EPSILON);
        assert!(grade_points("").abs() < f64::EPSILON);
        assert!(grade_points("b").abs() < f64::EPSILON);
    }

    #[test]
    fn b_is_the_lowest_eligible_grade() {
        assert!(Eligibility::assess(&student(true, Some("B"))).eligible);
        assert!(Eligibility::assess(&student(true, Some("A+"))).eligible);

        let below = Eligibility::assess(&student(true, Some("B-")));
        assert!(!below.eligible);
        assert!(!below.meets_grade);
        assert!((below.grade_points - 2.7).abs() < f64::EPSILON);
    }

    #[test]
    fn microteaching_is_required() {
        let result = Eligibility::assess(&student(false, Some("A")));
        assert!(!result.eligible);
        assert!(result.meets_grade);
    }

    #[test]
    fn missing_grade_is_shown_as_not_available() {
        let result = Eligibility::assess(&student(true, None));
        assert_eq!(result.microteaching_grade, MISSING_GRADE);
        assert!(result.grade_points.abs() < f64::EPSILON);
        assert!(!result.eligible);
    }
}
