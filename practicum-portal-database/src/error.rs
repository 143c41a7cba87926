use std::env::VarError;

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};
use diesel_async::pooled_connection::deadpool;
use thiserror::Error;

/// Unique constraint allowing one registration per student.
pub const REGISTRATION_STUDENT_KEY: &str = "registrations_student_id_key";

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database url not set in env variable DATABASE_URL")]
    DatabaseEnvUrl(#[from] VarError),
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database connection failed {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Database query failed {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Database migration failed {0}")]
    Migration(String),
    #[error("Database task failed {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("This student ID is already linked to another account")]
    StudentLinkedElsewhere,
    #[error("Quota not found")]
    QuotaNotFound,
    #[error("Quota has no free slot")]
    QuotaFull,
}

impl DatabaseError {
    /// A constraint violation raised outside of postgres, carrying the constraint name the
    /// database would report.
    #[must_use]
    pub fn constraint_violation(
        kind: DatabaseErrorKind,
        message: &str,
        constraint: Option<&'static str>,
    ) -> Self {
        Self::Database(diesel::result::Error::DatabaseError(
            kind,
            Box::new(ConstraintViolation {
                message: message.to_owned(),
                constraint,
            }),
        ))
    }

    fn unique_violation(&self) -> Option<&(dyn DatabaseErrorInformation + Send + Sync)> {
        match self {
            Self::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Some(&**info),
            _ => None,
        }
    }

    /// Whether the backend rejected a write because of any unique constraint.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation().is_some()
    }

    /// Whether the student already holds a registration.
    #[must_use]
    pub fn is_duplicate_registration(&self) -> bool {
        self.unique_violation()
            .and_then(DatabaseErrorInformation::constraint_name)
            == Some(REGISTRATION_STUDENT_KEY)
    }
}

#[derive(Debug)]
struct ConstraintViolation {
    message: String,
    constraint: Option<&'static str>,
}

impl DatabaseErrorInformation for ConstraintViolation {
    fn message(&self) -> &str {
        &self.message
    }

    fn details(&self) -> Option<&str> {
        None
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn column_name(&self) -> Option<&str> {
        None
    }

    fn constraint_name(&self) -> Option<&str> {
        self.constraint
    }

    fn statement_position(&self) -> Option<i32> {
        None
    }
}
