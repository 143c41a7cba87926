use http::StatusCode;
use practicum_portal_database::models::{NewStudent, Registration, Subject};
use practicum_portal_database::{DatabaseError, PortalStore};
use practicum_portal_rules::eligibility::Eligibility;
use practicum_portal_rules::quota::{available, selectable};
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;

/// Outcomes of a registration attempt that are shown to the student.
#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    #[error("Please log in before registering")]
    NotAuthenticated,
    #[error("You are not eligible for Field Experience Practice")]
    NotEligible,
    #[error("This school does not offer the selected subject")]
    QuotaNotFound,
    #[error("The selected school has no free slot for you")]
    NotSelectable,
    #[error("You have already registered for a school")]
    AlreadyRegistered,
    #[error("This student ID is already linked to another account")]
    StudentLinkedElsewhere,
    #[error("Registration failed: {0}")]
    Failed(DatabaseError),
}

impl From<DatabaseError> for RegistrationError {
    fn from(value: DatabaseError) -> Self {
        if value.is_duplicate_registration() {
            return Self::AlreadyRegistered;
        }
        match value {
            DatabaseError::StudentLinkedElsewhere => Self::StudentLinkedElsewhere,
            DatabaseError::QuotaNotFound => Self::QuotaNotFound,
            DatabaseError::QuotaFull => Self::NotSelectable,
            other => Self::Failed(other),
        }
    }
}

impl RegistrationError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotEligible | Self::NotSelectable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::QuotaNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered | Self::StudentLinkedElsewhere => StatusCode::CONFLICT,
            Self::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Checks the selection again and writes the student link and the registration.
///
/// `quota_id` is the row picked on the school list. Without it the slot is taken from
/// [`PortalStore::quota_for`]. The store re-checks the free slot under a row lock.
pub async fn register(
    store: &dyn PortalStore,
    user: Option<&AuthenticatedUser>,
    eligibility: &Eligibility,
    school_id: i32,
    subject: Subject,
    quota_id: Option<i32>,
) -> Result<Registration, RegistrationError> {
    let user = user.ok_or(RegistrationError::NotAuthenticated)?;
    if !eligibility.eligible {
        return Err(RegistrationError::NotEligible);
    }

    let quota = match quota_id {
        Some(quota_id) => store.quota(quota_id).await?.filter(|(quota, _)| {
            quota.school_id == school_id && quota.subject == subject
        }),
        None => store.quota_for(school_id, subject).await?,
    };
    let (quota, school) = quota.ok_or(RegistrationError::QuotaNotFound)?;
    let free = available(quota.total_quota, quota.registered_count);
    if !selectable(free, eligibility.gpa, school.min_gpa) {
        warn!(school_id, %subject, free, "refusing registration for an inert quota");
        return Err(RegistrationError::NotSelectable);
    }

    let student = NewStudent {
        student_id: eligibility.student_id.clone(),
        user_id: Some(user.id.clone()),
        name: eligibility.name.clone(),
        has_microteaching: eligibility.has_microteaching,
    };
    let registration = store.register(&user.id, &student, quota.id).await?;
    info!(
        student_id = %eligibility.student_id,
        school_id,
        %subject,
        quota_id = quota.id,
        "registered student"
    );
    Ok(registration)
}

#[cfg(test)]
mod tests {
    use practicum_portal_database::memory::MemoryStore;
    use practicum_portal_database::models::NewSchool;
    use practicum_portal_database::models::NewSchoolQuota;

    use super::*;

    fn user(id: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            id: id.to_owned(),
            email: None,
        }
    }

    async fn seeded(total_quota: i32, min_gpa: f64) -> (MemoryStore, i32, Eligibility) {
        let store = MemoryStore::new();
        let student = store.insert_student("2021001", "Siti Rahma", true, Some("A-"), 3.4);
        let school = store
            .create_school(&NewSchool {
                name: "SMA Negeri 1".to_owned(),
                location: "Bandung".to_owned(),
                address: None,
                latitude: None,
                longitude: None,
                min_gpa,
            })
            .await
            .unwrap();
        store
            .create_quota(&NewSchoolQuota {
                school_id: school.id,
                subject: Subject::Chemistry,
                total_quota,
            })
            .await
            .unwrap();
        (store, school.id, Eligibility::assess(&student))
    }

    #[tokio::test]
    async fn registers_a_logged_in_eligible_student() {
        let (store, school_id, eligibility) = seeded(5, 3.0).await;
        let registration = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await
        .unwrap();
        assert_eq!(registration.school_id, school_id);
        assert_eq!(store.registrations().len(), 1);
        assert_eq!(store.students()[0].user_id.as_deref(), Some("oidc-1"));
    }

    #[tokio::test]
    async fn requires_a_login() {
        let (store, school_id, eligibility) = seeded(5, 0.0).await;
        let result = register(
            &store,
            None,
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::NotAuthenticated)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Please log in before registering"
        );
    }

    #[tokio::test]
    async fn second_attempt_reports_already_registered() {
        let (store, school_id, eligibility) = seeded(5, 0.0).await;
        let user = user("oidc-1");
        register(&store, Some(&user), &eligibility, school_id, Subject::Chemistry, None)
            .await
            .unwrap();
        let again = register(
            &store,
            Some(&user),
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await;
        assert!(matches!(again, Err(RegistrationError::AlreadyRegistered)));
        assert_eq!(store.registrations().len(), 1);
    }

    #[tokio::test]
    async fn gpa_gate_and_full_quota_are_enforced() {
        let (store, school_id, eligibility) = seeded(5, 3.8).await;
        let gated = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await;
        assert!(matches!(gated, Err(RegistrationError::NotSelectable)));

        let (store, school_id, eligibility) = seeded(0, 0.0).await;
        let full = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await;
        assert!(matches!(full, Err(RegistrationError::NotSelectable)));
        assert!(store.registrations().is_empty());
    }

    #[tokio::test]
    async fn unknown_quota_is_not_found() {
        let (store, school_id, eligibility) = seeded(5, 0.0).await;
        let result = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Physics,
            None,
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::QuotaNotFound)));
    }

    #[tokio::test]
    async fn duplicate_quota_rows_register_against_the_open_one() {
        let (store, school_id, eligibility) = seeded(0, 3.0).await;
        let open = store
            .create_quota(&NewSchoolQuota {
                school_id,
                subject: Subject::Chemistry,
                total_quota: 5,
            })
            .await
            .unwrap();

        let registration = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Chemistry,
            None,
        )
        .await
        .unwrap();
        assert_eq!(registration.quota_id, Some(open.id));

        let counts: Vec<_> = store
            .quotas()
            .await
            .unwrap()
            .into_iter()
            .map(|(quota, _)| (quota.total_quota, quota.registered_count))
            .collect();
        assert_eq!(counts, vec![(0, 0), (5, 1)]);
    }

    #[tokio::test]
    async fn posted_quota_must_belong_to_the_selection() {
        let (store, school_id, eligibility) = seeded(5, 3.0).await;
        let (quota, _) = store
            .quota_for(school_id, Subject::Chemistry)
            .await
            .unwrap()
            .unwrap();

        let mismatched = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Physics,
            Some(quota.id),
        )
        .await;
        assert!(matches!(mismatched, Err(RegistrationError::QuotaNotFound)));

        let registration = register(
            &store,
            Some(&user("oidc-1")),
            &eligibility,
            school_id,
            Subject::Chemistry,
            Some(quota.id),
        )
        .await
        .unwrap();
        assert_eq!(registration.quota_id, Some(quota.id));
    }

    #[test]
    fn write_time_refusals_map_to_user_messages() {
        assert!(matches!(
            RegistrationError::from(DatabaseError::QuotaFull),
            RegistrationError::NotSelectable
        ));
        assert!(matches!(
            RegistrationError::from(DatabaseError::QuotaNotFound),
            RegistrationError::QuotaNotFound
        ));
    }

    #[test]
    fn other_database_errors_keep_their_message() {
        let error = RegistrationError::from(DatabaseError::Migration("boom".to_owned()));
        assert_eq!(
            error.to_string(),
            "Registration failed: Database migration failed boom"
        );
    }
}
