//! A [`PortalStore`] kept in process memory.
//!
//! It mirrors the constraints of the postgres schema (unique student ids, one registration per
//! student, cascading school deletion, the registered count trigger) so the backend can be
//! tested without a database.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use diesel::result::DatabaseErrorKind;

use crate::error::REGISTRATION_STUDENT_KEY;
use crate::models::{
    NewSchool, NewSchoolQuota, NewStudent, Registration, School, SchoolQuota, Student, Subject,
    UserRole,
};
use crate::{DatabaseError, PortalStore};

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    schools: Vec<School>,
    quotas: Vec<SchoolQuota>,
    registrations: Vec<Registration>,
    user_roles: Vec<UserRole>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn school(&self, id: i32) -> Option<&School> {
        self.schools.iter().find(|school| school.id == id)
    }

    fn with_school(&self, quota: &SchoolQuota) -> Option<(SchoolQuota, School)> {
        self.school(quota.school_id)
            .map(|school| (quota.clone(), school.clone()))
    }

    fn joined_by_school_name(&self) -> Vec<(SchoolQuota, School)> {
        let mut rows: Vec<_> = self
            .quotas
            .iter()
            .filter_map(|quota| self.with_school(quota))
            .collect();
        rows.sort_by(|(a_quota, a_school), (b_quota, b_school)| {
            a_school
                .name
                .cmp(&b_school.name)
                .then(a_school.id.cmp(&b_school.id))
                .then(a_quota.id.cmp(&b_quota.id))
        });
        rows
    }

    fn adjust_registered_count(&mut self, quota_id: Option<i32>, delta: i32) {
        if let Some(quota) = self
            .quotas
            .iter_mut()
            .find(|quota| Some(quota.id) == quota_id)
        {
            quota.registered_count = (quota.registered_count + delta).max(0);
        }
    }
}

fn violation(kind: DatabaseErrorKind, message: &str) -> DatabaseError {
    DatabaseError::constraint_violation(kind, message, None)
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an academic record the way the registrar import would.
    pub fn insert_student(
        &self,
        student_id: &str,
        name: &str,
        has_microteaching: bool,
        microteaching_grade: Option<&str>,
        gpa: f64,
    ) -> Student {
        let mut tables = self.tables();
        let student = Student {
            id: tables.next_id(),
            student_id: student_id.to_owned(),
            user_id: None,
            name: name.to_owned(),
            has_microteaching,
            microteaching_grade: microteaching_grade.map(ToOwned::to_owned),
            gpa,
        };
        tables.students.push(student.clone());
        student
    }

    pub fn grant_role(&self, user_id: &str, role: &str) {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.user_roles.push(UserRole {
            id,
            user_id: user_id.to_owned(),
            role: role.to_owned(),
        });
    }

    #[must_use]
    pub fn registrations(&self) -> Vec<Registration> {
        self.tables().registrations.clone()
    }

    #[must_use]
    pub fn students(&self) -> Vec<Student> {
        self.tables().students.clone()
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn student_by_student_id(
        &self,
        student_id: &str,
    ) -> Result<Option<Student>, DatabaseError> {
        Ok(self
            .tables()
            .students
            .iter()
            .find(|student| student.student_id == student_id)
            .cloned())
    }

    async fn open_quotas(
        &self,
        subject: Option<Subject>,
    ) -> Result<Vec<(SchoolQuota, School)>, DatabaseError> {
        let mut rows = self.tables().joined_by_school_name();
        rows.retain(|(quota, _)| {
            quota.total_quota > 0 && subject.map_or(true, |subject| quota.subject == subject)
        });
        Ok(rows)
    }

    async fn quota_for(
        &self,
        school_id: i32,
        subject: Subject,
    ) -> Result<Option<(SchoolQuota, School)>, DatabaseError> {
        let tables = self.tables();
        Ok(tables
            .quotas
            .iter()
            .filter(|quota| quota.school_id == school_id && quota.subject == subject)
            .min_by_key(|quota| (quota.total_quota - quota.registered_count <= 0, quota.id))
            .and_then(|quota| tables.with_school(quota)))
    }

    async fn register(
        &self,
        user_id: &str,
        student: &NewStudent,
        quota_id: i32,
    ) -> Result<Registration, DatabaseError> {
        let mut tables = self.tables();
        let linked = tables
            .students
            .iter()
            .find(|row| row.user_id.as_deref() == Some(user_id))
            .map(|row| row.id);
        // Nothing is written until every check passed, which stands in for the rollback.
        let (student_key, pending_student) = if let Some(id) = linked {
            (id, None)
        } else {
            match tables
                .students
                .iter()
                .position(|row| row.student_id == student.student_id)
            {
                Some(index) if tables.students[index].user_id.is_some() => {
                    return Err(DatabaseError::StudentLinkedElsewhere);
                }
                Some(index) => (tables.students[index].id, Some(index)),
                None => (tables.next_id(), None),
            }
        };
        let quota = tables
            .quotas
            .iter()
            .find(|quota| quota.id == quota_id)
            .cloned()
            .ok_or(DatabaseError::QuotaNotFound)?;
        if quota.total_quota - quota.registered_count <= 0 {
            return Err(DatabaseError::QuotaFull);
        }
        if tables
            .registrations
            .iter()
            .any(|registration| registration.student_id == student_key)
        {
            return Err(DatabaseError::constraint_violation(
                DatabaseErrorKind::UniqueViolation,
                "duplicate key value violates unique constraint \"registrations_student_id_key\"",
                Some(REGISTRATION_STUDENT_KEY),
            ));
        }
        match pending_student {
            Some(index) => tables.students[index].user_id = Some(user_id.to_owned()),
            None if linked.is_none() => tables.students.push(Student {
                id: student_key,
                student_id: student.student_id.clone(),
                user_id: Some(user_id.to_owned()),
                name: student.name.clone(),
                has_microteaching: student.has_microteaching,
                microteaching_grade: None,
                gpa: 0.0,
            }),
            None => {}
        }
        let registration = Registration {
            id: tables.next_id(),
            student_id: student_key,
            school_id: quota.school_id,
            subject: quota.subject,
            quota_id: Some(quota.id),
        };
        tables.registrations.push(registration.clone());
        tables.adjust_registered_count(registration.quota_id, 1);
        Ok(registration)
    }

    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .tables()
            .user_roles
            .iter()
            .any(|row| row.user_id == user_id && row.role == role))
    }

    async fn schools(&self) -> Result<Vec<School>, DatabaseError> {
        let mut schools = self.tables().schools.clone();
        schools.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(schools)
    }

    async fn create_school(&self, school: &NewSchool) -> Result<School, DatabaseError> {
        let mut tables = self.tables();
        let school = School {
            id: tables.next_id(),
            name: school.name.clone(),
            location: school.location.clone(),
            address: school.address.clone(),
            latitude: school.latitude,
            longitude: school.longitude,
            min_gpa: school.min_gpa,
        };
        tables.schools.push(school.clone());
        Ok(school)
    }

    async fn delete_school(&self, id: i32) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        let before = tables.schools.len();
        tables.schools.retain(|school| school.id != id);
        tables.quotas.retain(|quota| quota.school_id != id);
        tables
            .registrations
            .retain(|registration| registration.school_id != id);
        Ok(tables.schools.len() < before)
    }

    async fn quotas(&self) -> Result<Vec<(SchoolQuota, School)>, DatabaseError> {
        let mut rows = self.tables().joined_by_school_name();
        rows.sort_by(|(a_quota, a_school), (b_quota, b_school)| {
            a_school
                .name
                .cmp(&b_school.name)
                .then(a_quota.subject.as_str().cmp(b_quota.subject.as_str()))
                .then(a_quota.id.cmp(&b_quota.id))
        });
        Ok(rows)
    }

    async fn quota(&self, id: i32) -> Result<Option<(SchoolQuota, School)>, DatabaseError> {
        let tables = self.tables();
        Ok(tables
            .quotas
            .iter()
            .find(|quota| quota.id == id)
            .and_then(|quota| tables.with_school(quota)))
    }

    async fn create_quota(&self, quota: &NewSchoolQuota) -> Result<SchoolQuota, DatabaseError> {
        let mut tables = self.tables();
        if tables.school(quota.school_id).is_none() {
            return Err(violation(
                DatabaseErrorKind::ForeignKeyViolation,
                "insert or update on table \"school_quotas\" violates foreign key constraint",
            ));
        }
        if quota.total_quota < 0 {
            return Err(violation(
                DatabaseErrorKind::CheckViolation,
                "new row for relation \"school_quotas\" violates check constraint",
            ));
        }
        let quota = SchoolQuota {
            id: tables.next_id(),
            school_id: quota.school_id,
            subject: quota.subject,
            total_quota: quota.total_quota,
            registered_count: 0,
        };
        tables.quotas.push(quota.clone());
        Ok(quota)
    }

    async fn update_quota_total(&self, id: i32, total_quota: i32) -> Result<bool, DatabaseError> {
        if total_quota < 0 {
            return Err(violation(
                DatabaseErrorKind::CheckViolation,
                "new row for relation \"school_quotas\" violates check constraint",
            ));
        }
        let mut tables = self.tables();
        Ok(tables
            .quotas
            .iter_mut()
            .find(|quota| quota.id == id)
            .map(|quota| quota.total_quota = total_quota)
            .is_some())
    }

    async fn delete_quota(&self, id: i32) -> Result<bool, DatabaseError> {
        let mut tables = self.tables();
        let before = tables.quotas.len();
        tables.quotas.retain(|quota| quota.id != id);
        for registration in &mut tables.registrations {
            if registration.quota_id == Some(id) {
                registration.quota_id = None;
            }
        }
        Ok(tables.quotas.len() < before)
    }

    async fn registration_count(&self) -> Result<i64, DatabaseError> {
        Ok(i64::try_from(self.tables().registrations.len()).unwrap_or(i64::MAX))
    }

    async fn school_count(&self) -> Result<i64, DatabaseError> {
        Ok(i64::try_from(self.tables().schools.len()).unwrap_or(i64::MAX))
    }
}
