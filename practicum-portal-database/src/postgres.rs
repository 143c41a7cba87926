use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::models::{
    NewRegistration, NewSchool, NewSchoolQuota, NewStudent, Registration, School, SchoolQuota,
    Student, Subject,
};
use crate::schema::{registrations, school_quotas, schools, students, user_roles};
use crate::{DatabaseError, Pool, PortalStore};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortalStore for PgStore {
    async fn student_by_student_id(
        &self,
        student_id: &str,
    ) -> Result<Option<Student>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(students::table
            .filter(students::student_id.eq(student_id))
            .select(Student::as_select())
            .first(&mut connection)
            .await
            .optional()?)
    }

    async fn open_quotas(
        &self,
        subject: Option<Subject>,
    ) -> Result<Vec<(SchoolQuota, School)>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let mut query = school_quotas::table
            .inner_join(schools::table)
            .filter(school_quotas::total_quota.gt(0))
            .order((schools::name.asc(), schools::id.asc(), school_quotas::id.asc()))
            .select((SchoolQuota::as_select(), School::as_select()))
            .into_boxed();
        if let Some(subject) = subject {
            query = query.filter(school_quotas::subject.eq(subject));
        }
        Ok(query.load(&mut connection).await?)
    }

    async fn quota_for(
        &self,
        school_id: i32,
        subject: Subject,
    ) -> Result<Option<(SchoolQuota, School)>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(school_quotas::table
            .inner_join(schools::table)
            .filter(school_quotas::school_id.eq(school_id))
            .filter(school_quotas::subject.eq(subject))
            .order((
                (school_quotas::total_quota - school_quotas::registered_count)
                    .gt(0)
                    .desc(),
                school_quotas::id.asc(),
            ))
            .select((SchoolQuota::as_select(), School::as_select()))
            .first(&mut connection)
            .await
            .optional()?)
    }

    async fn register(
        &self,
        user_id: &str,
        student: &NewStudent,
        quota_id: i32,
    ) -> Result<Registration, DatabaseError> {
        let mut connection = self.pool.get().await?;
        connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    let linked = students::table
                        .filter(students::user_id.eq(user_id))
                        .select(students::id)
                        .first::<i32>(connection)
                        .await
                        .optional()?;
                    let student_key = if let Some(id) = linked {
                        id
                    } else {
                        let existing = students::table
                            .filter(students::student_id.eq(&student.student_id))
                            .select((students::id, students::user_id))
                            .first::<(i32, Option<String>)>(connection)
                            .await
                            .optional()?;
                        match existing {
                            Some((id, None)) => {
                                debug!(student_id = %student.student_id, "linking student record");
                                diesel::update(students::table.find(id))
                                    .set(students::user_id.eq(user_id))
                                    .execute(connection)
                                    .await?;
                                id
                            }
                            Some((_, Some(_))) => return Err(DatabaseError::StudentLinkedElsewhere),
                            None => {
                                debug!(student_id = %student.student_id, "creating student record");
                                diesel::insert_into(students::table)
                                    .values(NewStudent {
                                        user_id: Some(user_id.to_owned()),
                                        ..student.clone()
                                    })
                                    .returning(students::id)
                                    .get_result(connection)
                                    .await?
                            }
                        }
                    };

                    // held until commit, a concurrent registration waits and sees our count
                    let quota = school_quotas::table
                        .find(quota_id)
                        .select(SchoolQuota::as_select())
                        .for_update()
                        .get_result(connection)
                        .await
                        .optional()?
                        .ok_or(DatabaseError::QuotaNotFound)?;
                    if quota.total_quota - quota.registered_count <= 0 {
                        debug!(quota_id, "quota is full");
                        return Err(DatabaseError::QuotaFull);
                    }

                    Ok(diesel::insert_into(registrations::table)
                        .values(NewRegistration {
                            student_id: student_key,
                            school_id: quota.school_id,
                            subject: quota.subject,
                            quota_id: Some(quota.id),
                        })
                        .returning(Registration::as_returning())
                        .get_result(connection)
                        .await?)
                }
                .scope_boxed()
            })
            .await
    }

    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::select(diesel::dsl::exists(
            user_roles::table
                .filter(user_roles::user_id.eq(user_id))
                .filter(user_roles::role.eq(role)),
        ))
        .get_result(&mut connection)
        .await?)
    }

    async fn schools(&self) -> Result<Vec<School>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(schools::table
            .order((schools::name.asc(), schools::id.asc()))
            .select(School::as_select())
            .load(&mut connection)
            .await?)
    }

    async fn create_school(&self, school: &NewSchool) -> Result<School, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(schools::table)
            .values(school)
            .returning(School::as_returning())
            .get_result(&mut connection)
            .await?)
    }

    async fn delete_school(&self, id: i32) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(schools::table.find(id))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn quotas(&self) -> Result<Vec<(SchoolQuota, School)>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(school_quotas::table
            .inner_join(schools::table)
            .order((
                schools::name.asc(),
                school_quotas::subject.asc(),
                school_quotas::id.asc(),
            ))
            .select((SchoolQuota::as_select(), School::as_select()))
            .load(&mut connection)
            .await?)
    }

    async fn quota(&self, id: i32) -> Result<Option<(SchoolQuota, School)>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(school_quotas::table
            .inner_join(schools::table)
            .filter(school_quotas::id.eq(id))
            .select((SchoolQuota::as_select(), School::as_select()))
            .first(&mut connection)
            .await
            .optional()?)
    }

    async fn create_quota(&self, quota: &NewSchoolQuota) -> Result<SchoolQuota, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(school_quotas::table)
            .values(quota)
            .returning(SchoolQuota::as_returning())
            .get_result(&mut connection)
            .await?)
    }

    async fn update_quota_total(&self, id: i32, total_quota: i32) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let updated = diesel::update(school_quotas::table.find(id))
            .set(school_quotas::total_quota.eq(total_quota))
            .execute(&mut connection)
            .await?;
        Ok(updated > 0)
    }

    async fn delete_quota(&self, id: i32) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(school_quotas::table.find(id))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn registration_count(&self) -> Result<i64, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(registrations::table
            .count()
            .get_result(&mut connection)
            .await?)
    }

    async fn school_count(&self) -> Result<i64, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(schools::table.count().get_result(&mut connection).await?)
    }
}
