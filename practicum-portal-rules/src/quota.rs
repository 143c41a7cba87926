use serde::Serialize;

/// Below this share of free slots a quota is shown as limited.
pub const LIMITED_RATIO: f64 = 0.30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QuotaStatus {
    Full,
    Limited,
    Available,
}

impl QuotaStatus {
    #[must_use]
    pub fn classify(total_quota: i32, registered_count: i32) -> Self {
        let available = available(total_quota, registered_count);
        if available <= 0 {
            return Self::Full;
        }
        if f64::from(available) / f64::from(total_quota) < LIMITED_RATIO {
            Self::Limited
        } else {
            Self::Available
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Limited => "Limited",
            Self::Available => "Available",
        }
    }
}

/// Not clamped: an overbooked quota yields a negative value.
#[must_use]
pub const fn available(total_quota: i32, registered_count: i32) -> i32 {
    total_quota.saturating_sub(registered_count)
}

#[must_use]
pub fn selectable(available: i32, student_gpa: f64, min_gpa: f64) -> bool {
    available > 0 && student_gpa >= min_gpa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(available(10, 8), 2);
        assert_eq!(QuotaStatus::classify(10, 8), QuotaStatus::Limited);
        assert_eq!(QuotaStatus::classify(10, 5), QuotaStatus::Available);
        assert_eq!(QuotaStatus::classify(10, 7), QuotaStatus::Available);
        assert_eq!(QuotaStatus::classify(10, 10), QuotaStatus::Full);
    }

    #[test]
    fn overbooked_and_empty_quotas_are_full() {
        assert_eq!(available(3, 5), -2);
        assert_eq!(QuotaStatus::classify(3, 5), QuotaStatus::Full);
        assert_eq!(QuotaStatus::classify(0, 0), QuotaStatus::Full);
    }

    #[test]
    fn selection_needs_a_free_slot_and_the_gpa() {
        assert!(selectable(1, 3.0, 3.0));
        assert!(selectable(4, 3.5, 0.0));
        assert!(!selectable(0, 4.0, 0.0));
        assert!(!selectable(-1, 4.0, 0.0));
        assert!(!selectable(5, 2.9, 3.0));
    }
}
