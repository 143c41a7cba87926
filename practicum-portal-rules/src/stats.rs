use practicum_portal_database::models::SchoolQuota;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationStatistics {
    pub total_registrations: i64,
    pub total_schools: i64,
    pub total_quota: i64,
    pub registered: i64,
    pub available_slots: i64,
}

impl RegistrationStatistics {
    #[must_use]
    pub fn aggregate<'a>(
        total_registrations: i64,
        total_schools: i64,
        quotas: impl IntoIterator<Item = &'a SchoolQuota>,
    ) -> Self {
        let (total_quota, registered) = quotas
            .into_iter()
            .fold((0_i64, 0_i64), |(total, registered), quota| {
                (
                    total + i64::from(quota.total_quota),
                    registered + i64::from(quota.registered_count),
                )
            });
        Self {
            total_registrations,
            total_schools,
            total_quota,
            registered,
            available_slots: total_quota - registered,
        }
    }
}
