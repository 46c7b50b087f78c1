use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;
use tracing::debug;

use crate::calendar::{AsOf, ProjectSpan, Reference, WeekClass, WeekStart};
use crate::models::{Project, WeeklyHoursRow};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    forecast: f64,
    actual: f64,
}

impl Totals {
    fn add(&mut self, other: Totals) {
        self.forecast += other.forecast;
        self.actual += other.actual;
    }

    fn point(self, period: String) -> RecoveryPoint {
        RecoveryPoint::new(period, self.forecast, self.actual)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPoint {
    pub period: String,
    pub forecast_dollars: f64,
    pub actual_dollars: f64,
    /// `None` when nothing was forecast; never rendered as 0%.
    pub recovery_percent: Option<f64>,
    pub dollars_delta: f64,
}

impl RecoveryPoint {
    pub fn new(period: String, forecast_dollars: f64, actual_dollars: f64) -> Self {
        Self {
            period,
            forecast_dollars,
            actual_dollars,
            recovery_percent: recovery_percent(forecast_dollars, actual_dollars),
            dollars_delta: actual_dollars - forecast_dollars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecovery {
    #[serde(flatten)]
    pub point: RecoveryPoint,
    pub completed: bool,
    /// Cumulative from project start through this month; only set once the
    /// month's last week has completed.
    pub overall_to_date: Option<RecoveryPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySummary {
    pub as_of: AsOf,
    pub current_week: WeekStart,
    pub previous_weeks: Vec<RecoveryPoint>,
    pub previous_weeks_total: RecoveryPoint,
    pub to_date: RecoveryPoint,
    pub months: Vec<MonthlyRecovery>,
}

pub fn recovery_percent(forecast_dollars: f64, actual_dollars: f64) -> Option<f64> {
    if forecast_dollars > 0.0 {
        Some(actual_dollars / forecast_dollars * 100.0)
    } else {
        None
    }
}

// Missing actuals count as zero dollars here, unlike the budget rollup.
fn weekly_totals(
    span: &ProjectSpan,
    rows: &[WeeklyHoursRow],
    reference: &Reference,
) -> BTreeMap<WeekStart, Totals> {
    let mut totals: BTreeMap<WeekStart, Totals> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|row| span.contains_week(row.week_start, reference))
    {
        totals.entry(row.week_start).or_default().add(Totals {
            forecast: row.planned_dollars(),
            actual: row.actual_dollars(),
        });
    }
    totals
}

/// Empty when `last` precedes `first`.
fn range_key(first: WeekStart, last: WeekStart) -> String {
    if last < first {
        String::new()
    } else {
        format!("{}..{}", first.key(), last.key())
    }
}

pub fn weekly_recovery(
    span: &ProjectSpan,
    rows: &[WeeklyHoursRow],
    reference: &Reference,
) -> Vec<RecoveryPoint> {
    weekly_totals(span, rows, reference)
        .into_iter()
        .map(|(week, totals)| totals.point(week.key()))
        .collect()
}

pub fn compute_recovery(
    span: &ProjectSpan,
    rows: &[WeeklyHoursRow],
    reference: &Reference,
    recent_weeks: usize,
) -> RecoverySummary {
    let totals = weekly_totals(span, rows, reference);
    let current_week = reference.current_week();
    let totals_for = |week: &WeekStart| totals.get(week).copied().unwrap_or_default();

    let mut recent: Vec<WeekStart> =
        std::iter::successors(Some(current_week.previous()), |week| Some(week.previous()))
            .take(recent_weeks)
            .collect();
    recent.reverse();

    let previous_weeks: Vec<RecoveryPoint> = recent
        .iter()
        .map(|week| totals_for(week).point(week.key()))
        .collect();

    let mut recent_total = Totals::default();
    recent.iter().for_each(|week| recent_total.add(totals_for(week)));
    let recent_key = match (recent.first(), recent.last()) {
        (Some(first), Some(last)) => range_key(*first, *last),
        _ => String::new(),
    };

    let mut to_date = Totals::default();
    for (week, week_totals) in totals.iter() {
        if reference.classify(*week) == WeekClass::Completed {
            to_date.add(*week_totals);
        }
    }
    let last_completed = current_week.previous().min(span.end_week(reference));
    let to_date = to_date.point(range_key(span.start_week(), last_completed));

    let summary = RecoverySummary {
        as_of: reference.as_of(),
        current_week,
        previous_weeks,
        previous_weeks_total: recent_total.point(recent_key),
        to_date,
        months: monthly_recovery(span, &totals, reference),
    };

    debug!(
        as_of = %summary.as_of,
        to_date_percent = ?summary.to_date.recovery_percent,
        months = summary.months.len(),
        "computed revenue recovery"
    );

    summary
}

fn monthly_recovery(
    span: &ProjectSpan,
    totals: &BTreeMap<WeekStart, Totals>,
    reference: &Reference,
) -> Vec<MonthlyRecovery> {
    let mut months: BTreeMap<(i32, u32), Vec<WeekStart>> = BTreeMap::new();
    for week in span.weeks(reference) {
        months
            .entry((week.date().year(), week.date().month()))
            .or_default()
            .push(week);
    }

    let mut cumulative = Totals::default();
    let mut result = Vec::with_capacity(months.len());

    for ((year, month), weeks) in months {
        let mut month_totals = Totals::default();
        for week in weeks.iter() {
            month_totals.add(totals.get(week).copied().unwrap_or_default());
        }
        cumulative.add(month_totals);

        let completed = weeks
            .last()
            .is_some_and(|last| reference.classify(*last) == WeekClass::Completed);
        let key = format!("{year:04}-{month:02}");
        let overall_to_date = completed.then(|| cumulative.point(key.clone()));

        result.push(MonthlyRecovery {
            point: month_totals.point(key),
            completed,
            overall_to_date,
        });
    }

    result
}

pub fn recovery_for_project(
    project: &Project,
    reference: &Reference,
    recent_weeks: usize,
) -> RecoverySummary {
    compute_recovery(&project.span, &project.weekly_rows, reference, recent_weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> Reference {
        Reference::from_as_of(AsOf::from_instant(
            Utc.with_ymd_and_hms(2025, 2, 16, 23, 59, 59).unwrap(),
        ))
    }

    fn row(week: NaiveDate, planned: f64, actual: Option<f64>) -> WeeklyHoursRow {
        WeeklyHoursRow {
            week_start: WeekStart::of(week),
            person: "Jules Moreno".to_string(),
            planned_hours: planned,
            actual_hours: actual,
            rate: 100.0,
        }
    }

    fn sample_rows() -> Vec<WeeklyHoursRow> {
        vec![
            row(date(2025, 1, 6), 40.0, Some(40.0)),
            row(date(2025, 1, 13), 40.0, Some(40.0)),
            row(date(2025, 1, 20), 40.0, Some(30.0)),
            row(date(2025, 1, 27), 40.0, Some(40.0)),
            row(date(2025, 2, 3), 40.0, Some(20.0)),
            row(date(2025, 2, 10), 40.0, None),
            row(date(2025, 2, 17), 40.0, None),
        ]
    }

    fn span() -> ProjectSpan {
        ProjectSpan::new(date(2025, 1, 6), Some(date(2025, 2, 28)))
    }

    fn assert_percent(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("percent should be defined");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn previous_weeks_are_listed_individually() {
        let summary = compute_recovery(&span(), &sample_rows(), &reference(), 4);

        let periods: Vec<&str> = summary
            .previous_weeks
            .iter()
            .map(|point| point.period.as_str())
            .collect();
        assert_eq!(periods, vec!["2025-01-20", "2025-01-27", "2025-02-03", "2025-02-10"]);
        assert_percent(summary.previous_weeks[0].recovery_percent, 75.0);
        assert_percent(summary.previous_weeks[1].recovery_percent, 100.0);
        assert_percent(summary.previous_weeks[2].recovery_percent, 50.0);
        assert_percent(summary.previous_weeks[3].recovery_percent, 0.0);
        assert_eq!(summary.previous_weeks[3].dollars_delta, -4000.0);
    }

    #[test]
    fn previous_weeks_combine_into_one_point() {
        let summary = compute_recovery(&span(), &sample_rows(), &reference(), 4);

        assert_eq!(summary.previous_weeks_total.period, "2025-01-20..2025-02-10");
        assert_eq!(summary.previous_weeks_total.forecast_dollars, 16000.0);
        assert_eq!(summary.previous_weeks_total.actual_dollars, 9000.0);
        assert_percent(summary.previous_weeks_total.recovery_percent, 56.25);
    }

    #[test]
    fn to_date_covers_completed_weeks_only() {
        let summary = compute_recovery(&span(), &sample_rows(), &reference(), 4);

        assert_eq!(summary.to_date.period, "2025-01-06..2025-02-10");
        assert_eq!(summary.to_date.forecast_dollars, 24000.0);
        assert_eq!(summary.to_date.actual_dollars, 17000.0);
        assert_eq!(summary.to_date.dollars_delta, -7000.0);
    }

    #[test]
    fn months_carry_overall_only_once_complete() {
        let summary = compute_recovery(&span(), &sample_rows(), &reference(), 4);

        assert_eq!(summary.months.len(), 2);
        let january = &summary.months[0];
        assert_eq!(january.point.period, "2025-01");
        assert!(january.completed);
        assert_percent(january.point.recovery_percent, 93.75);
        let overall = january.overall_to_date.as_ref().expect("january is complete");
        assert_eq!(overall.forecast_dollars, 16000.0);
        assert_eq!(overall.actual_dollars, 15000.0);

        let february = &summary.months[1];
        assert_eq!(february.point.period, "2025-02");
        assert!(!february.completed);
        assert_eq!(february.point.forecast_dollars, 12000.0);
        assert_eq!(february.point.actual_dollars, 2000.0);
        assert_eq!(february.overall_to_date, None);
    }

    #[test]
    fn zero_forecast_is_undefined_not_zero() {
        let summary = compute_recovery(&span(), &[], &reference(), 4);

        assert!(summary.previous_weeks.iter().all(|point| point.recovery_percent.is_none()));
        assert_eq!(summary.previous_weeks_total.recovery_percent, None);
        assert_eq!(summary.to_date.recovery_percent, None);
        assert!(summary.months.iter().all(|month| month.point.recovery_percent.is_none()));
    }

    #[test]
    fn weekly_points_aggregate_people() {
        let mut rows = sample_rows();
        rows.push(WeeklyHoursRow {
            person: "Kiara Patel".to_string(),
            ..row(date(2025, 1, 6), 20.0, Some(10.0))
        });

        let points = weekly_recovery(&span(), &rows, &reference());

        assert_eq!(points[0].period, "2025-01-06");
        assert_eq!(points[0].forecast_dollars, 6000.0);
        assert_eq!(points[0].actual_dollars, 5000.0);
        assert_eq!(points.len(), 7);
    }

    #[test]
    fn open_ended_months_match_span_weeks() {
        let span = ProjectSpan::new(date(2025, 2, 3), None);
        let rows = vec![
            row(date(2025, 2, 3), 40.0, Some(40.0)),
            row(date(2025, 2, 17), 40.0, None),
            row(date(2025, 3, 3), 40.0, None),
            row(date(2025, 6, 2), 40.0, None),
        ];

        let summary = compute_recovery(&span, &rows, &reference(), 4);
        let points = weekly_recovery(&span, &rows, &reference());

        let months: Vec<&str> = summary
            .months
            .iter()
            .map(|month| month.point.period.as_str())
            .collect();
        assert_eq!(months, vec!["2025-02"]);
        assert_eq!(summary.months[0].point.forecast_dollars, 8000.0);
        let weeks: Vec<&str> = points.iter().map(|point| point.period.as_str()).collect();
        assert_eq!(weeks, vec!["2025-02-03", "2025-02-17"]);
    }

    #[test]
    fn to_date_key_is_empty_before_project_starts() {
        let span = ProjectSpan::new(date(2025, 3, 3), None);
        let rows = vec![row(date(2025, 3, 3), 40.0, None)];

        let summary = compute_recovery(&span, &rows, &reference(), 4);

        assert_eq!(summary.to_date.period, "");
        assert_eq!(summary.to_date.recovery_percent, None);
    }

    #[test]
    fn to_date_key_stops_at_span_end() {
        let span = ProjectSpan::new(date(2025, 1, 6), Some(date(2025, 1, 24)));

        let summary = compute_recovery(&span, &sample_rows(), &reference(), 4);

        assert_eq!(summary.to_date.period, "2025-01-06..2025-01-20");
        assert_eq!(summary.to_date.forecast_dollars, 12000.0);
    }
}
