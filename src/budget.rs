use serde::Serialize;
use tracing::{debug, warn};

use crate::calendar::{AsOf, ProjectSpan, Reference, WeekClass, WeekStart};
use crate::models::{BudgetLine, Project, WeeklyHoursRow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEnvelope {
    pub low_hours: f64,
    pub high_hours: f64,
    pub low_dollars: f64,
    pub high_dollars: f64,
}

impl BudgetEnvelope {
    pub fn total(lines: &[BudgetLine]) -> Self {
        lines.iter().fold(Self::default(), |acc, line| Self {
            low_hours: acc.low_hours + line.low_hours,
            high_hours: acc.high_hours + line.high_hours,
            low_dollars: acc.low_dollars + line.low_dollars,
            high_dollars: acc.high_dollars + line.high_dollars,
        })
    }
}

/// Hours and dollars as a percentage of each envelope bound. `None` when the
/// bound is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnPercentages {
    pub hours_low: Option<f64>,
    pub hours_high: Option<f64>,
    pub dollars_low: Option<f64>,
    pub dollars_high: Option<f64>,
}

impl BurnPercentages {
    fn against(envelope: &BudgetEnvelope, hours: f64, dollars: f64) -> Self {
        Self {
            hours_low: percent_of(hours, envelope.low_hours),
            hours_high: percent_of(hours, envelope.high_hours),
            dollars_low: percent_of(dollars, envelope.low_dollars),
            dollars_high: percent_of(dollars, envelope.high_dollars),
        }
    }
}

/// Envelope minus actuals to date. Negative means over budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Remaining {
    pub hours_low: f64,
    pub hours_high: f64,
    pub dollars_low: f64,
    pub dollars_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResult {
    pub as_of: AsOf,
    pub current_week: WeekStart,

    pub planned_hours_to_date: f64,
    pub actual_hours_to_date: f64,
    pub planned_dollars_to_date: f64,
    pub actual_dollars_to_date: f64,

    pub projected_current_week_hours: f64,
    pub projected_current_week_dollars: f64,
    pub projected_future_weeks_hours: f64,
    pub projected_future_weeks_dollars: f64,

    pub forecast_hours: f64,
    pub forecast_dollars: f64,

    pub envelope: BudgetEnvelope,
    pub burn: BurnPercentages,
    pub forecast_burn: BurnPercentages,
    pub remaining: Remaining,

    pub missing_actuals: bool,
    pub forecast_incomplete: bool,
    pub missing_actual_weeks: Vec<WeekStart>,
}

pub fn percent_of(value: f64, total: f64) -> Option<f64> {
    if total == 0.0 {
        None
    } else {
        Some(value / total * 100.0)
    }
}

/// `forecast = actual to date + projected current week + projected future weeks`.
/// Rows outside the span's week range are ignored.
pub fn compute_budget_rollups(
    span: &ProjectSpan,
    weekly_rows: &[WeeklyHoursRow],
    budget_lines: &[BudgetLine],
    reference: &Reference,
) -> BudgetResult {
    let mut planned_hours_to_date = 0.0;
    let mut actual_hours_to_date = 0.0;
    let mut planned_dollars_to_date = 0.0;
    let mut actual_dollars_to_date = 0.0;
    let mut current_hours = 0.0;
    let mut current_dollars = 0.0;
    let mut future_hours = 0.0;
    let mut future_dollars = 0.0;
    let mut missing_actual_weeks: Vec<WeekStart> = Vec::new();

    for row in weekly_rows.iter() {
        if !span.contains_week(row.week_start, reference) {
            continue;
        }

        match reference.classify(row.week_start) {
            WeekClass::Completed => {
                planned_hours_to_date += row.planned_hours;
                planned_dollars_to_date += row.planned_dollars();
                match row.actual_hours {
                    Some(hours) => {
                        actual_hours_to_date += hours;
                        actual_dollars_to_date += hours * row.rate;
                    }
                    None if row.planned_hours > 0.0 => {
                        missing_actual_weeks.push(row.week_start);
                    }
                    None => {}
                }
            }
            WeekClass::Current => {
                current_hours += row.planned_hours;
                current_dollars += row.planned_dollars();
            }
            WeekClass::Future => {
                future_hours += row.planned_hours;
                future_dollars += row.planned_dollars();
            }
        }
    }

    missing_actual_weeks.sort();
    missing_actual_weeks.dedup();
    let missing_actuals = !missing_actual_weeks.is_empty();

    let forecast_hours = actual_hours_to_date + current_hours + future_hours;
    let forecast_dollars = actual_dollars_to_date + current_dollars + future_dollars;

    let envelope = BudgetEnvelope::total(budget_lines);
    let burn = BurnPercentages::against(&envelope, actual_hours_to_date, actual_dollars_to_date);
    let forecast_burn = BurnPercentages::against(&envelope, forecast_hours, forecast_dollars);
    let remaining = Remaining {
        hours_low: envelope.low_hours - actual_hours_to_date,
        hours_high: envelope.high_hours - actual_hours_to_date,
        dollars_low: envelope.low_dollars - actual_dollars_to_date,
        dollars_high: envelope.high_dollars - actual_dollars_to_date,
    };

    BudgetResult {
        as_of: reference.as_of(),
        current_week: reference.current_week(),
        planned_hours_to_date,
        actual_hours_to_date,
        planned_dollars_to_date,
        actual_dollars_to_date,
        projected_current_week_hours: current_hours,
        projected_current_week_dollars: current_dollars,
        projected_future_weeks_hours: future_hours,
        projected_future_weeks_dollars: future_dollars,
        forecast_hours,
        forecast_dollars,
        envelope,
        burn,
        forecast_burn,
        remaining,
        missing_actuals,
        forecast_incomplete: missing_actuals,
        missing_actual_weeks,
    }
}

pub fn rollup_project(project: &Project, reference: &Reference) -> BudgetResult {
    let result = compute_budget_rollups(
        &project.span,
        &project.weekly_rows,
        &project.budget_lines,
        reference,
    );

    debug!(
        project = %project.name,
        as_of = %result.as_of,
        actual_hours_to_date = result.actual_hours_to_date,
        forecast_hours = result.forecast_hours,
        forecast_dollars = result.forecast_dollars,
        "computed budget rollup"
    );
    if result.missing_actuals {
        warn!(
            project = %project.name,
            weeks = result.missing_actual_weeks.len(),
            "completed weeks have planned hours without reported actuals"
        );
    }

    result
}
