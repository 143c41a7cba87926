use core::fmt::{self, Display};
use core::str::FromStr;
use std::io::Write as _;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use crate::schema::{registrations, school_quotas, schools, students, user_roles};

/// The closed set of subjects a school can offer practicum slots for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, AsExpression, FromSqlRow, Serialize,
    Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Chemistry,
    Math,
    Physics,
    Biology,
    English,
    Indonesian,
}

impl Subject {
    pub const ALL: [Self; 6] = [
        Self::Chemistry,
        Self::Math,
        Self::Physics,
        Self::Biology,
        Self::English,
        Self::Indonesian,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chemistry => "chemistry",
            Self::Math => "math",
            Self::Physics => "physics",
            Self::Biology => "biology",
            Self::English => "english",
            Self::Indonesian => "indonesian",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Chemistry => "Chemistry",
            Self::Math => "Mathematics",
            Self::Physics => "Physics",
            Self::Biology => "Biology",
            Self::English => "English",
            Self::Indonesian => "Indonesian",
        }
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown subject {0:?}")]
pub struct UnknownSubject(pub String);

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.as_str() == value)
            .ok_or_else(|| UnknownSubject(value.to_owned()))
    }
}

impl ToSql<Text, Pg> for Subject {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Subject {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = core::str::from_utf8(bytes.as_bytes())?;
        Ok(value.parse()?)
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Serialize)]
#[diesel(table_name = students)]
pub struct Student {
    pub id: i32,
    pub student_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub has_microteaching: bool,
    pub microteaching_grade: Option<String>,
    pub gpa: f64,
}

/// The externally verified fields used when a registration has to create the student row.
#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = students)]
pub struct NewStudent {
    pub student_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub has_microteaching: bool,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Serialize)]
#[diesel(table_name = schools)]
pub struct School {
    pub id: i32,
    pub name: String,
    pub location: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub min_gpa: f64,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = schools)]
pub struct NewSchool {
    pub name: String,
    pub location: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub min_gpa: f64,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq, Serialize)]
#[diesel(table_name = school_quotas)]
#[diesel(belongs_to(School))]
pub struct SchoolQuota {
    pub id: i32,
    pub school_id: i32,
    pub subject: Subject,
    pub total_quota: i32,
    pub registered_count: i32,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = school_quotas)]
pub struct NewSchoolQuota {
    pub school_id: i32,
    pub subject: Subject,
    pub total_quota: i32,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Serialize)]
#[diesel(table_name = registrations)]
pub struct Registration {
    pub id: i32,
    pub student_id: i32,
    pub school_id: i32,
    pub subject: Subject,
    pub quota_id: Option<i32>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = registrations)]
pub struct NewRegistration {
    pub student_id: i32,
    pub school_id: i32,
    pub subject: Subject,
    pub quota_id: Option<i32>,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = user_roles)]
pub struct UserRole {
    pub id: i32,
    pub user_id: String,
    pub role: String,
}
