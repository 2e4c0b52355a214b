use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::errors::TimeclockError;

/// Per-company attendance policy. Loaded from the store and passed
/// explicitly into every engine call so one process can serve many
/// companies with different policies concurrently and deterministically.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct WorkPolicy {
    #[schema(example = "08:00:00", value_type = String)]
    pub expected_entry: NaiveTime,
    #[schema(example = "17:00:00", value_type = String)]
    pub expected_exit: NaiveTime,

    /// Grace applied to delay only, never to early departure.
    #[schema(example = 10)]
    pub tolerance_minutes: i64,
    #[schema(example = 480)]
    pub standard_daily_minutes: i64,

    #[schema(example = "22:00:00", value_type = String)]
    pub night_start: NaiveTime,
    #[schema(example = "05:00:00", value_type = String)]
    pub night_end: NaiveTime,

    /// Same-employee submissions inside this window are rejected as
    /// duplicates regardless of fingerprint.
    #[schema(example = 3)]
    pub cooldown_minutes: i64,

    /// Corrections are refused once the original punch is older than this.
    #[schema(example = 7)]
    pub max_adjustment_days: i64,
    #[schema(example = 20)]
    pub min_description_len: u32,
    pub require_evidence: bool,

    /// When set, a failed audit write fails the whole transition.
    pub compliance_mode: bool,
}

impl Default for WorkPolicy {
    fn default() -> Self {
        Self {
            expected_entry: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            expected_exit: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            tolerance_minutes: 10,
            standard_daily_minutes: 480,
            night_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            night_end: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            cooldown_minutes: 3,
            max_adjustment_days: 7,
            min_description_len: 20,
            require_evidence: false,
            compliance_mode: true,
        }
    }
}

impl WorkPolicy {
    pub async fn load(pool: &MySqlPool, company_id: u64) -> Result<Self, TimeclockError> {
        sqlx::query_as::<_, WorkPolicy>(
            r#"
            SELECT expected_entry, expected_exit, tolerance_minutes,
                   standard_daily_minutes, night_start, night_end,
                   cooldown_minutes, max_adjustment_days, min_description_len,
                   require_evidence, compliance_mode
            FROM companies
            WHERE id = ?
            "#,
        )
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .ok_or(TimeclockError::NotFound("company"))
    }

    /// Business days are Monday through Friday.
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekends_are_not_work_days() {
        let policy = WorkPolicy::default();
        // 2026-01-05 is a Monday.
        assert!(policy.is_work_day(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()));
        assert!(!policy.is_work_day(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()));
        assert!(!policy.is_work_day(NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()));
    }
}
