use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Non-fatal findings produced while aggregating messy punch data. Reports
/// must still render, so these degrade the result instead of failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// A break was opened but never closed; break minutes count as zero.
    MissingBreakEnd { date: NaiveDate },
    /// A break end without a matching start; break minutes count as zero.
    MissingBreakStart { date: NaiveDate },
    /// More than one entry/exit; only the earliest/latest is used.
    ExtraPunches { date: NaiveDate, kind: String, count: u32 },
    /// An entry without an exit makes the day partial.
    MissingExit { date: NaiveDate },
    /// A stored kind the aggregator does not recognize was skipped.
    UnknownKind { date: NaiveDate, kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Complete,
    Partial,
    Absence,
    DayOff,
}

/// One employee-day, minute-level. Derived and recomputable; never the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyMetrics {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: DayStatus,
    /// Both an entry and an exit exist.
    pub complete: bool,
    pub work_day: bool,

    pub regular_minutes: i64,
    pub overtime_minutes: i64,
    pub break_minutes: i64,
    pub night_minutes: i64,
    pub delay_minutes: i64,
    pub early_departure_minutes: i64,

    pub warnings: Vec<AggregationWarning>,
}

impl DailyMetrics {
    pub fn empty(date: NaiveDate, work_day: bool) -> Self {
        Self {
            date,
            status: if work_day { DayStatus::Absence } else { DayStatus::DayOff },
            complete: false,
            work_day,
            regular_minutes: 0,
            overtime_minutes: 0,
            break_minutes: 0,
            night_minutes: 0,
            delay_minutes: 0,
            early_departure_minutes: 0,
            warnings: Vec::new(),
        }
    }
}

/// One ISO week: field-wise sums of its dailies. Never re-derived from raw
/// punches, which is what makes the rollup round-trip hold by construction.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeeklyMetrics {
    pub year: i32,
    pub iso_week: u32,

    pub regular_minutes: i64,
    pub overtime_minutes: i64,
    pub break_minutes: i64,
    pub night_minutes: i64,
    pub delay_minutes: i64,
    pub early_departure_minutes: i64,
    pub absence_minutes: i64,

    pub complete_days: u32,
    pub partial_days: u32,
    pub absence_days: u32,
}

/// A month or arbitrary range: field-wise sums of its weeklies.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodMetrics {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,

    pub regular_minutes: i64,
    pub overtime_minutes: i64,
    pub break_minutes: i64,
    pub night_minutes: i64,
    pub delay_minutes: i64,
    pub early_departure_minutes: i64,
    pub absence_minutes: i64,

    pub complete_days: u32,
    pub partial_days: u32,
    pub absence_days: u32,
}

/// Compensatory balance for one period, in minutes throughout.
/// closing = opening + credits − debits.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HourBankEntry {
    pub opening_minutes: i64,
    pub credit_minutes: i64,
    pub debit_minutes: i64,
    pub closing_minutes: i64,

    /// Same balance rendered in hours for report display.
    pub closing_hours: f64,
}
