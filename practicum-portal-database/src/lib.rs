pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use diesel::Connection as _;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness as _};
pub use error::DatabaseError;
use tracing::info;

use crate::models::{
    NewSchool, NewSchoolQuota, NewStudent, Registration, School, SchoolQuota, Student, Subject,
};

pub type Pool = deadpool::Pool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub const ADMIN_ROLE: &str = "admin";

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub fn get_database_connection(database_url: &str) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(config).build()?)
}

pub fn get_database_connection_from_env() -> Result<Pool, DatabaseError> {
    let database_url = std::env::var("DATABASE_URL")?;
    get_database_connection(&database_url)
}

/// Applies all pending embedded migrations.
///
/// The migration harness is synchronous so this runs on the blocking thread pool.
pub async fn run_migrations(database_url: &str) -> Result<(), DatabaseError> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut connection =
            AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)?;
        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| DatabaseError::Migration(err.to_string()))?;
        for version in applied {
            info!("applied migration {version}");
        }
        Ok(())
    })
    .await?
}

/// Every table operation the portal performs.
///
/// Implemented for postgres by [`postgres::PgStore`] and, for tests, by `memory::MemoryStore`.
#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn student_by_student_id(&self, student_id: &str)
        -> Result<Option<Student>, DatabaseError>;

    /// Quota rows with a positive total joined with their school, ordered by school name.
    async fn open_quotas(
        &self,
        subject: Option<Subject>,
    ) -> Result<Vec<(SchoolQuota, School)>, DatabaseError>;

    /// The row a registration for `(school_id, subject)` takes its slot from: the lowest id with
    /// a free slot, otherwise the lowest id.
    async fn quota_for(
        &self,
        school_id: i32,
        subject: Subject,
    ) -> Result<Option<(SchoolQuota, School)>, DatabaseError>;

    /// Links or creates the student for `user_id` and takes a slot of quota `quota_id`.
    ///
    /// Runs as one transaction holding a lock on the quota row, so concurrent registrations
    /// can't overbook it. Fails with [`DatabaseError::QuotaFull`] when no slot is left.
    async fn register(
        &self,
        user_id: &str,
        student: &NewStudent,
        quota_id: i32,
    ) -> Result<Registration, DatabaseError>;

    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, DatabaseError>;

    async fn schools(&self) -> Result<Vec<School>, DatabaseError>;

    async fn create_school(&self, school: &NewSchool) -> Result<School, DatabaseError>;

    /// Returns whether a row was deleted. Quotas of the school are removed by the cascade.
    async fn delete_school(&self, id: i32) -> Result<bool, DatabaseError>;

    async fn quotas(&self) -> Result<Vec<(SchoolQuota, School)>, DatabaseError>;

    async fn quota(&self, id: i32) -> Result<Option<(SchoolQuota, School)>, DatabaseError>;

    async fn create_quota(&self, quota: &NewSchoolQuota) -> Result<SchoolQuota, DatabaseError>;

    async fn update_quota_total(&self, id: i32, total_quota: i32) -> Result<bool, DatabaseError>;

    async fn delete_quota(&self, id: i32) -> Result<bool, DatabaseError>;

    async fn registration_count(&self) -> Result<i64, DatabaseError>;

    async fn school_count(&self) -> Result<i64, DatabaseError>;
}
