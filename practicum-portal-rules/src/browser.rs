use indexmap::IndexMap;
use practicum_portal_database::models::{School, SchoolQuota, Subject};
use serde::Serialize;

use crate::quota::{available, selectable, QuotaStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubjectEntry {
    pub quota_id: i32,
    pub subject: Subject,
    pub total_quota: i32,
    pub registered_count: i32,
    pub available: i32,
    pub status: QuotaStatus,
}

impl From<&SchoolQuota> for SubjectEntry {
    fn from(quota: &SchoolQuota) -> Self {
        Self {
            quota_id: quota.id,
            subject: quota.subject,
            total_quota: quota.total_quota,
            registered_count: quota.registered_count,
            available: available(quota.total_quota, quota.registered_count),
            status: QuotaStatus::classify(quota.total_quota, quota.registered_count),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchoolListing {
    pub school: School,
    pub subjects: Vec<SubjectEntry>,
}

impl SchoolListing {
    #[must_use]
    pub fn entry(&self, quota_id: i32) -> Option<&SubjectEntry> {
        self.subjects.iter().find(|entry| entry.quota_id == quota_id)
    }

    /// The first entry for `subject` the student may pick. A school can list a subject twice.
    #[must_use]
    pub fn selectable_entry(&self, subject: Subject, student_gpa: f64) -> Option<&SubjectEntry> {
        self.subjects
            .iter()
            .find(|entry| entry.subject == subject && self.is_selectable(entry, student_gpa))
    }

    #[must_use]
    pub fn meets_gpa(&self, student_gpa: f64) -> bool {
        student_gpa >= self.school.min_gpa
    }

    #[must_use]
    pub fn is_selectable(&self, entry: &SubjectEntry, student_gpa: f64) -> bool {
        selectable(entry.available, student_gpa, self.school.min_gpa)
    }

    /// Case-insensitive substring match on the school name or location.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.school.name.to_lowercase().contains(&query)
            || self.school.location.to_lowercase().contains(&query)
    }
}

/// One listing per school in the order the schools first appear in `rows`.
#[must_use]
pub fn group_by_school(rows: Vec<(SchoolQuota, School)>) -> Vec<SchoolListing> {
    let mut listings: IndexMap<i32, SchoolListing> = IndexMap::new();
    for (quota, school) in rows {
        listings
            .entry(school.id)
            .or_insert_with(|| SchoolListing {
                school,
                subjects: Vec::new(),
            })
            .subjects
            .push(SubjectEntry::from(&quota));
    }
    listings.into_values().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub school_id: i32,
    pub subject: Subject,
    /// The quota row the registration will take its slot from.
    pub quota_id: i32,
}

/// Applies a click on `(school_id, subject)`.
///
/// Entries without a free slot or with a GPA gate above the student's GPA are inert and keep
/// the current selection.
#[must_use]
pub fn select(
    current: Option<Selection>,
    listings: &[SchoolListing],
    school_id: i32,
    subject: Subject,
    student_gpa: f64,
) -> Option<Selection> {
    let clicked = listings
        .iter()
        .find(|listing| listing.school.id == school_id)
        .and_then(|listing| listing.selectable_entry(subject, student_gpa));
    match clicked {
        Some(entry) => Some(Selection {
            school_id,
            subject,
            quota_id: entry.quota_id,
        }),
        None => current,
    }
}
