use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, IsoWeek, NaiveDate, Utc};

use crate::model::metrics::{
    AggregationWarning, DailyMetrics, DayStatus, PeriodMetrics, WeeklyMetrics,
};
use crate::model::policy::WorkPolicy;
use crate::model::punch::{PunchKind, PunchRecord};

/// One clock event as the aggregator sees it. The storage rows are reduced
/// to this at the boundary so the whole computation stays pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchEvent {
    pub kind: PunchKind,
    pub at: DateTime<Utc>,
}

/// Reduce ledger rows to events, bucketed by calendar day. Rows whose kind
/// text does not parse are skipped with a warning carried into that day's
/// metrics; attendance data is messy and reports must still render.
pub fn bucket_by_day(
    records: &[PunchRecord],
) -> BTreeMap<NaiveDate, (Vec<PunchEvent>, Vec<AggregationWarning>)> {
    let mut days: BTreeMap<NaiveDate, (Vec<PunchEvent>, Vec<AggregationWarning>)> =
        BTreeMap::new();
    for record in records {
        let date = record.punched_at.date_naive();
        let bucket = days.entry(date).or_default();
        match record.kind() {
            Ok(kind) => bucket.0.push(PunchEvent {
                kind,
                at: record.punched_at,
            }),
            Err(_) => bucket.1.push(AggregationWarning::UnknownKind {
                date,
                kind: record.kind.clone(),
            }),
        }
    }
    days
}

/// Turn one employee-day's ordered punches into minute-level metrics.
/// Pure: same punches and policy always give the same result.
pub fn compute_daily(
    date: NaiveDate,
    punches: &[PunchEvent],
    policy: &WorkPolicy,
) -> DailyMetrics {
    let work_day = policy.is_work_day(date);
    if punches.is_empty() {
        return DailyMetrics::empty(date, work_day);
    }

    let mut metrics = DailyMetrics::empty(date, work_day);
    metrics.status = DayStatus::Partial;

    let entry = pick_bound(punches, PunchKind::Entry, date, &mut metrics.warnings, true);
    let exit = pick_bound(punches, PunchKind::Exit, date, &mut metrics.warnings, false);

    let (entry, exit) = match (entry, exit) {
        (Some(entry), Some(exit)) => (entry, exit),
        (Some(_), None) => {
            metrics.warnings.push(AggregationWarning::MissingExit { date });
            return metrics;
        }
        _ => return metrics,
    };

    // Cross-midnight shift: an exit recorded before the entry belongs to
    // the following day.
    let exit = if exit < entry { exit + Duration::days(1) } else { exit };

    let gross_minutes = (exit - entry).num_minutes();
    let break_minutes = break_minutes(punches, date, &mut metrics.warnings);
    let net_minutes = (gross_minutes - break_minutes).max(0);

    let expected_entry = date.and_time(policy.expected_entry).and_utc();
    let expected_exit = date.and_time(policy.expected_exit).and_utc();

    let late_by = (entry - expected_entry).num_minutes();
    let delay_minutes = (late_by - policy.tolerance_minutes).max(0);
    // No tolerance on the way out; the asymmetry is intentional.
    let early_departure_minutes = (expected_exit - exit).num_minutes().max(0);

    let overtime_minutes = (net_minutes - policy.standard_daily_minutes).max(0);

    metrics.status = DayStatus::Complete;
    metrics.complete = true;
    metrics.regular_minutes = net_minutes - overtime_minutes;
    metrics.overtime_minutes = overtime_minutes;
    metrics.break_minutes = break_minutes;
    metrics.night_minutes = night_overlap_minutes(entry, exit, policy);
    metrics.delay_minutes = delay_minutes;
    metrics.early_departure_minutes = early_departure_minutes;
    metrics
}

/// Earliest entry / latest exit, warning when interior duplicates exist.
fn pick_bound(
    punches: &[PunchEvent],
    kind: PunchKind,
    date: NaiveDate,
    warnings: &mut Vec<AggregationWarning>,
    earliest: bool,
) -> Option<DateTime<Utc>> {
    let mut instants: Vec<DateTime<Utc>> = punches
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| p.at)
        .collect();
    if instants.len() > 1 {
        warnings.push(AggregationWarning::ExtraPunches {
            date,
            kind: kind.to_string(),
            count: instants.len() as u32,
        });
    }
    instants.sort();
    if earliest {
        instants.first().copied()
    } else {
        instants.last().copied()
    }
}

/// First break start to last break end, with the same midnight-rollover
/// rule as the work span. A lone boundary counts zero and warns.
fn break_minutes(
    punches: &[PunchEvent],
    date: NaiveDate,
    warnings: &mut Vec<AggregationWarning>,
) -> i64 {
    let start = pick_bound(punches, PunchKind::BreakStart, date, warnings, true);
    let end = pick_bound(punches, PunchKind::BreakEnd, date, warnings, false);

    match (start, end) {
        (Some(start), Some(end)) => {
            let end = if end < start { end + Duration::days(1) } else { end };
            (end - start).num_minutes()
        }
        (Some(_), None) => {
            warnings.push(AggregationWarning::MissingBreakEnd { date });
            0
        }
        (None, Some(_)) => {
            warnings.push(AggregationWarning::MissingBreakStart { date });
            0
        }
        (None, None) => 0,
    }
}

/// Minutes of overlap between the work span and the configured night
/// window, counted independently of the worked/overtime split.
fn night_overlap_minutes(
    span_start: DateTime<Utc>,
    span_end: DateTime<Utc>,
    policy: &WorkPolicy,
) -> i64 {
    let mut total = 0;
    let first = span_start.date_naive() - Duration::days(1);
    let last = span_end.date_naive();
    let mut day = first;
    while day <= last {
        let window_start = day.and_time(policy.night_start).and_utc();
        let window_end = if policy.night_end <= policy.night_start {
            (day + Duration::days(1)).and_time(policy.night_end).and_utc()
        } else {
            day.and_time(policy.night_end).and_utc()
        };
        let overlap_start = span_start.max(window_start);
        let overlap_end = span_end.min(window_end);
        if overlap_end > overlap_start {
            total += (overlap_end - overlap_start).num_minutes();
        }
        day += Duration::days(1);
    }
    total
}

/// Compute one DailyMetrics per calendar day in [from, to], including
/// punch-less days so absences on business days are visible.
pub fn compute_range(
    from: NaiveDate,
    to: NaiveDate,
    records: &[PunchRecord],
    policy: &WorkPolicy,
) -> Vec<DailyMetrics> {
    let buckets = bucket_by_day(records);
    let mut dailies = Vec::new();
    let mut date = from;
    while date <= to {
        let metrics = match buckets.get(&date) {
            Some((events, skipped)) => {
                let mut m = compute_daily(date, events, policy);
                m.warnings.extend(skipped.iter().cloned());
                m
            }
            None => DailyMetrics::empty(date, policy.is_work_day(date)),
        };
        dailies.push(metrics);
        date += Duration::days(1);
    }
    dailies
}

/// Field-wise summation of dailies into their ISO weeks. No re-derivation
/// from raw punches happens here, which is what guarantees that weekly
/// totals always equal the sum of their dailies.
pub fn rollup_weeks(dailies: &[DailyMetrics], policy: &WorkPolicy) -> Vec<WeeklyMetrics> {
    let mut weeks: BTreeMap<(i32, u32), WeeklyMetrics> = BTreeMap::new();
    for daily in dailies {
        let iso: IsoWeek = daily.date.iso_week();
        let week = weeks
            .entry((iso.year(), iso.week()))
            .or_insert_with(|| WeeklyMetrics {
                year: iso.year(),
                iso_week: iso.week(),
                regular_minutes: 0,
                overtime_minutes: 0,
                break_minutes: 0,
                night_minutes: 0,
                delay_minutes: 0,
                early_departure_minutes: 0,
                absence_minutes: 0,
                complete_days: 0,
                partial_days: 0,
                absence_days: 0,
            });
        week.regular_minutes += daily.regular_minutes;
        week.overtime_minutes += daily.overtime_minutes;
        week.break_minutes += daily.break_minutes;
        week.night_minutes += daily.night_minutes;
        week.delay_minutes += daily.delay_minutes;
        week.early_departure_minutes += daily.early_departure_minutes;
        match daily.status {
            DayStatus::Complete => week.complete_days += 1,
            DayStatus::Partial => week.partial_days += 1,
            DayStatus::Absence => {
                week.absence_days += 1;
                week.absence_minutes += policy.standard_daily_minutes;
            }
            DayStatus::DayOff => {}
        }
    }
    weeks.into_values().collect()
}

/// Field-wise summation of weeklies into one period.
pub fn rollup_period(from: NaiveDate, to: NaiveDate, weeks: &[WeeklyMetrics]) -> PeriodMetrics {
    let mut period = PeriodMetrics {
        from,
        to,
        regular_minutes: 0,
        overtime_minutes: 0,
        break_minutes: 0,
        night_minutes: 0,
        delay_minutes: 0,
        early_departure_minutes: 0,
        absence_minutes: 0,
        complete_days: 0,
        partial_days: 0,
        absence_days: 0,
    };
    for week in weeks {
        period.regular_minutes += week.regular_minutes;
        period.overtime_minutes += week.overtime_minutes;
        period.break_minutes += week.break_minutes;
        period.night_minutes += week.night_minutes;
        period.delay_minutes += week.delay_minutes;
        period.early_departure_minutes += week.early_departure_minutes;
        period.absence_minutes += week.absence_minutes;
        period.complete_days += week.complete_days;
        period.partial_days += week.partial_days;
        period.absence_days += week.absence_days;
    }
    period
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, h, m, 0).unwrap()
    }

    fn event(kind: PunchKind, d: u32, h: u32, m: u32) -> PunchEvent {
        PunchEvent { kind, at: at(d, h, m) }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    // The reference day: entry 08:15, break 12:00–13:00, exit 17:50 against
    // an 08:00–17:00 schedule with 10 minutes tolerance and 480 standard.
    fn reference_day() -> Vec<PunchEvent> {
        vec![
            event(PunchKind::Entry, 5, 8, 15),
            event(PunchKind::BreakStart, 5, 12, 0),
            event(PunchKind::BreakEnd, 5, 13, 0),
            event(PunchKind::Exit, 5, 17, 50),
        ]
    }

    #[test]
    fn reference_scenario_matches_expected_minutes() {
        let m = compute_daily(date(5), &reference_day(), &WorkPolicy::default());

        assert!(m.complete);
        assert_eq!(m.status, DayStatus::Complete);
        assert_eq!(m.break_minutes, 60);
        // (17:50 - 08:15) - 60 = 515 net
        assert_eq!(m.regular_minutes + m.overtime_minutes, 515);
        assert_eq!(m.delay_minutes, 5);
        assert_eq!(m.early_departure_minutes, 0);
        assert_eq!(m.overtime_minutes, 35);
        assert_eq!(m.regular_minutes, 480);
        assert!(m.warnings.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let first = compute_daily(date(5), &reference_day(), &WorkPolicy::default());
        let second = compute_daily(date(5), &reference_day(), &WorkPolicy::default());
        assert_eq!(first, second);
    }

    #[test]
    fn entry_within_tolerance_has_zero_delay() {
        let punches = vec![
            event(PunchKind::Entry, 5, 8, 10),
            event(PunchKind::Exit, 5, 17, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.delay_minutes, 0);
    }

    #[test]
    fn exactly_zero_tolerance_on_time_entry_is_not_negative() {
        let mut policy = WorkPolicy::default();
        policy.tolerance_minutes = 0;
        let punches = vec![
            event(PunchKind::Entry, 5, 8, 0),
            event(PunchKind::Exit, 5, 17, 0),
        ];
        let m = compute_daily(date(5), &punches, &policy);
        assert_eq!(m.delay_minutes, 0);
    }

    #[test]
    fn early_departure_gets_no_tolerance() {
        let punches = vec![
            event(PunchKind::Entry, 5, 8, 0),
            event(PunchKind::Exit, 5, 16, 55),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        // 5 minutes early counts in full even though 5 < tolerance.
        assert_eq!(m.early_departure_minutes, 5);
    }

    #[test]
    fn missing_break_end_counts_zero_and_warns() {
        let punches = vec![
            event(PunchKind::Entry, 5, 8, 0),
            event(PunchKind::BreakStart, 5, 12, 0),
            event(PunchKind::Exit, 5, 17, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.break_minutes, 0);
        assert!(m.warnings.contains(&AggregationWarning::MissingBreakEnd { date: date(5) }));
        assert!(m.complete);
    }

    #[test]
    fn duplicate_entries_use_earliest_and_warn() {
        let punches = vec![
            event(PunchKind::Entry, 5, 8, 0),
            event(PunchKind::Entry, 5, 8, 40),
            event(PunchKind::Exit, 5, 17, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        // Span runs from the 08:00 entry; the 08:40 duplicate is ignored.
        assert_eq!(m.delay_minutes, 0);
        assert_eq!(m.regular_minutes + m.overtime_minutes, 540);
        assert!(m.warnings.iter().any(|w| matches!(
            w,
            AggregationWarning::ExtraPunches { count: 2, .. }
        )));
    }

    #[test]
    fn entry_only_is_partial_not_an_error() {
        let punches = vec![event(PunchKind::Entry, 5, 8, 0)];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.status, DayStatus::Partial);
        assert!(!m.complete);
        assert_eq!(m.regular_minutes, 0);
        assert!(m.warnings.contains(&AggregationWarning::MissingExit { date: date(5) }));
    }

    #[test]
    fn business_day_without_punches_is_an_absence() {
        let m = compute_daily(date(5), &[], &WorkPolicy::default());
        assert_eq!(m.status, DayStatus::Absence);
        let sunday = compute_daily(date(4), &[], &WorkPolicy::default());
        assert_eq!(sunday.status, DayStatus::DayOff);
    }

    #[test]
    fn cross_midnight_exit_rolls_to_next_day() {
        // 22:00 entry, 02:00 exit recorded with the same calendar date.
        let punches = vec![
            event(PunchKind::Entry, 5, 22, 0),
            event(PunchKind::Exit, 5, 2, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.regular_minutes + m.overtime_minutes, 240);
        assert_eq!(m.early_departure_minutes, 0);
    }

    #[test]
    fn night_window_overlap_is_counted_independently() {
        // 20:00 to 23:30 overlaps the 22:00–05:00 window by 90 minutes.
        let punches = vec![
            event(PunchKind::Entry, 5, 20, 0),
            event(PunchKind::Exit, 5, 23, 30),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.night_minutes, 90);

        // A full night shift 22:00–05:00 sits inside the window end to end.
        let punches = vec![
            event(PunchKind::Entry, 5, 22, 0),
            event(PunchKind::Exit, 5, 5, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.night_minutes, 420);

        // An early-morning span hits the tail of the previous night window.
        let punches = vec![
            event(PunchKind::Entry, 5, 4, 0),
            event(PunchKind::Exit, 5, 12, 0),
        ];
        let m = compute_daily(date(5), &punches, &WorkPolicy::default());
        assert_eq!(m.night_minutes, 60);
    }

    #[test]
    fn weekly_rollup_equals_field_wise_daily_sums() {
        let policy = WorkPolicy::default();
        let mut records = Vec::new();
        // Mon 2026-01-05 through Fri 2026-01-09, plus an absent Thursday.
        for d in [5u32, 6, 7, 9] {
            records.push(event(PunchKind::Entry, d, 8, 15));
            records.push(event(PunchKind::BreakStart, d, 12, 0));
            records.push(event(PunchKind::BreakEnd, d, 13, 0));
            records.push(event(PunchKind::Exit, d, 17, 50));
        }
        let dailies: Vec<DailyMetrics> = (5..=11u32)
            .map(|d| {
                let day: Vec<PunchEvent> =
                    records.iter().copied().filter(|p| p.at.day() == d).collect();
                compute_daily(date(d), &day, &policy)
            })
            .collect();

        let weeks = rollup_weeks(&dailies, &policy);
        assert_eq!(weeks.len(), 1);
        let week = &weeks[0];

        assert_eq!(
            week.regular_minutes,
            dailies.iter().map(|d| d.regular_minutes).sum::<i64>()
        );
        assert_eq!(
            week.overtime_minutes,
            dailies.iter().map(|d| d.overtime_minutes).sum::<i64>()
        );
        assert_eq!(
            week.delay_minutes,
            dailies.iter().map(|d| d.delay_minutes).sum::<i64>()
        );
        assert_eq!(
            week.night_minutes,
            dailies.iter().map(|d| d.night_minutes).sum::<i64>()
        );
        assert_eq!(week.complete_days, 4);
        assert_eq!(week.absence_days, 1); // the empty Thursday
        assert_eq!(week.absence_minutes, policy.standard_daily_minutes);
    }

    #[test]
    fn period_rollup_equals_field_wise_weekly_sums() {
        let policy = WorkPolicy::default();
        let records: Vec<PunchRecord> = Vec::new();
        let dailies = compute_range(date(5), date(18), &records, &policy);
        let weeks = rollup_weeks(&dailies, &policy);
        assert_eq!(weeks.len(), 2);

        let period = rollup_period(date(5), date(18), &weeks);
        assert_eq!(
            period.absence_minutes,
            weeks.iter().map(|w| w.absence_minutes).sum::<i64>()
        );
        assert_eq!(
            period.absence_days,
            weeks.iter().map(|w| w.absence_days).sum::<u32>()
        );
        // Ten business days in two weeks, all absent.
        assert_eq!(period.absence_days, 10);
    }
}
