use crate::model::metrics::{HourBankEntry, PeriodMetrics};

/// The one place where period totals become compensatory balance movement:
/// overtime credits the bank; delay, early departure and absence debit it.
/// Report variants must call this rather than re-deriving the mapping.
pub fn hour_bank_entry(opening_minutes: i64, period: &PeriodMetrics) -> HourBankEntry {
    let credit_minutes = period.overtime_minutes;
    let debit_minutes =
        period.delay_minutes + period.early_departure_minutes + period.absence_minutes;
    let closing_minutes = opening_minutes + credit_minutes - debit_minutes;
    HourBankEntry {
        opening_minutes,
        credit_minutes,
        debit_minutes,
        closing_minutes,
        closing_hours: minutes_to_hours(closing_minutes),
    }
}

pub fn minutes_to_hours(minutes: i64) -> f64 {
    minutes as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn period(overtime: i64, delay: i64, early: i64, absence: i64) -> PeriodMetrics {
        PeriodMetrics {
            from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            regular_minutes: 0,
            overtime_minutes: overtime,
            break_minutes: 0,
            night_minutes: 0,
            delay_minutes: delay,
            early_departure_minutes: early,
            absence_minutes: absence,
            complete_days: 0,
            partial_days: 0,
            absence_days: 0,
        }
    }

    #[test]
    fn closing_is_opening_plus_credits_minus_debits() {
        let entry = hour_bank_entry(120, &period(90, 20, 10, 0));
        assert_eq!(entry.credit_minutes, 90);
        assert_eq!(entry.debit_minutes, 30);
        assert_eq!(entry.closing_minutes, 120 + 90 - 30);
        assert!((entry.closing_hours - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absences_debit_a_full_standard_day() {
        let entry = hour_bank_entry(0, &period(0, 0, 0, 480));
        assert_eq!(entry.debit_minutes, 480);
        assert_eq!(entry.closing_minutes, -480);
    }

    #[test]
    fn balance_can_go_negative() {
        let entry = hour_bank_entry(-60, &period(0, 45, 30, 0));
        assert_eq!(entry.closing_minutes, -135);
        assert!((entry.closing_hours + 2.25).abs() < f64::EPSILON);
    }
}
