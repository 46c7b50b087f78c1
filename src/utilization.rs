use std::collections::BTreeMap;

use serde::Serialize;

use crate::calendar::{Reference, WeekClass, WeekStart};
use crate::config::ResourcingThresholds;
use crate::models::WeeklyHoursRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    Under,
    OnTrack,
    Over,
}

impl Variance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variance::Under => "under",
            Variance::OnTrack => "on_track",
            Variance::Over => "over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonWeekVariance {
    pub person: String,
    pub week: WeekStart,
    pub utilization: f64,
    pub variance: Variance,
}

/// Actual over planned hours. Undefined when nothing was planned or the
/// actual has not been reported.
pub fn weekly_utilization(planned_hours: f64, actual_hours: Option<f64>) -> Option<f64> {
    let actual = actual_hours?;
    if planned_hours > 0.0 {
        Some(actual / planned_hours)
    } else {
        None
    }
}

pub fn classify_variance(utilization: f64, thresholds: &ResourcingThresholds) -> Variance {
    if utilization < thresholds.low_variance {
        Variance::Under
    } else if utilization > thresholds.high_variance {
        Variance::Over
    } else {
        Variance::OnTrack
    }
}

/// Variance for every completed person-week with a defined utilization,
/// ordered by person then week. Rows for the same person and week are summed.
pub fn person_week_variances(
    rows: &[WeeklyHoursRow],
    reference: &Reference,
    thresholds: &ResourcingThresholds,
) -> Vec<PersonWeekVariance> {
    let mut grouped: BTreeMap<(String, WeekStart), (f64, Option<f64>)> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|row| reference.classify(row.week_start) == WeekClass::Completed)
    {
        let entry = grouped
            .entry((row.person.clone(), row.week_start))
            .or_insert((0.0, Some(0.0)));
        entry.0 += row.planned_hours;
        entry.1 = match (entry.1, row.actual_hours) {
            (Some(total), Some(hours)) => Some(total + hours),
            _ => None,
        };
    }

    grouped
        .into_iter()
        .filter_map(|((person, week), (planned, actual))| {
            let utilization = weekly_utilization(planned, actual)?;
            Some(PersonWeekVariance {
                person,
                week,
                utilization,
                variance: classify_variance(utilization, thresholds),
            })
        })
        .collect()
}
