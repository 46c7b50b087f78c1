use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::budget::{self, BudgetResult};
use crate::calendar::Reference;
use crate::config::{EngineConfig, RiskThresholds};
use crate::models::Project;
use crate::recovery::{self, RecoveryPoint, RecoverySummary};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskTag {
    ActualsMissing,
    LowBuffer,
    RecentRecoveryLow { weeks: usize, threshold: f64 },
    OverallRecoveryLow { threshold: f64 },
}

impl fmt::Display for RiskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTag::ActualsMissing => write!(f, "Actuals missing"),
            RiskTag::LowBuffer => write!(f, "Low buffer"),
            RiskTag::RecentRecoveryLow { weeks, threshold } => {
                write!(f, "Previous {weeks} weeks recovery < {threshold}%")
            }
            RiskTag::OverallRecoveryLow { threshold } => {
                write!(f, "Overall recovery < {threshold}%")
            }
        }
    }
}

impl Serialize for RiskTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskProject {
    pub project_id: Uuid,
    pub project_name: String,
    pub risks: Vec<RiskTag>,
}

/// Headroom left under the high hours envelope once the forecast lands, as a
/// percent of that envelope. Negative when the forecast is over budget.
pub fn buffer_percent(result: &BudgetResult) -> Option<f64> {
    budget::percent_of(
        result.envelope.high_hours - result.forecast_hours,
        result.envelope.high_hours,
    )
}

/// Mean of the defined percents; `None` when every point is undefined.
pub fn average_recovery(points: &[RecoveryPoint]) -> Option<f64> {
    let defined: Vec<f64> = points.iter().filter_map(|point| point.recovery_percent).collect();
    if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

pub fn budget_risks(result: &BudgetResult, thresholds: &RiskThresholds) -> Vec<RiskTag> {
    let mut risks = Vec::new();
    if result.missing_actuals {
        risks.push(RiskTag::ActualsMissing);
    }
    if buffer_percent(result).is_some_and(|buffer| buffer < thresholds.low_buffer_percent) {
        risks.push(RiskTag::LowBuffer);
    }
    risks
}

pub fn recovery_risks(summary: &RecoverySummary, thresholds: &RiskThresholds) -> Vec<RiskTag> {
    let mut risks = Vec::new();
    if average_recovery(&summary.previous_weeks)
        .is_some_and(|average| average < thresholds.recovery_percent)
    {
        risks.push(RiskTag::RecentRecoveryLow {
            weeks: summary.previous_weeks.len(),
            threshold: thresholds.recovery_percent,
        });
    }
    if summary
        .to_date
        .recovery_percent
        .is_some_and(|percent| percent < thresholds.recovery_percent)
    {
        risks.push(RiskTag::OverallRecoveryLow {
            threshold: thresholds.recovery_percent,
        });
    }
    risks
}

pub fn evaluate_project(
    project: &Project,
    reference: &Reference,
    config: &EngineConfig,
) -> Vec<RiskTag> {
    let rollup = budget::rollup_project(project, reference);
    let recovery = recovery::recovery_for_project(project, reference, config.recovery.recent_weeks);

    let mut risks: Vec<RiskTag> = Vec::new();
    for risk in budget_risks(&rollup, &config.thresholds)
        .into_iter()
        .chain(recovery_risks(&recovery, &config.thresholds))
    {
        if !risks.contains(&risk) {
            risks.push(risk);
        }
    }
    risks
}

/// Projects with at least one risk, most risks first.
pub fn evaluate_portfolio<'a, I>(
    projects: I,
    reference: &Reference,
    config: &EngineConfig,
) -> Vec<AtRiskProject>
where
    I: IntoIterator<Item = &'a Project>,
{
    let mut at_risk: Vec<AtRiskProject> = projects
        .into_iter()
        .filter_map(|project| {
            if !project.span.is_active(reference) {
                debug!(project = %project.name, "skipping inactive project");
                return None;
            }
            let risks = evaluate_project(project, reference, config);
            debug!(project = %project.name, risks = risks.len(), "evaluated project");
            if risks.is_empty() {
                None
            } else {
                Some(AtRiskProject {
                    project_id: project.id,
                    project_name: project.name.clone(),
                    risks,
                })
            }
        })
        .collect();

    at_risk.sort_by(|a, b| {
        b.risks
            .len()
            .cmp(&a.risks.len())
            .then_with(|| a.project_name.cmp(&b.project_name))
    });
    at_risk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{AsOf, ProjectSpan, WeekStart};
    use crate::models::{BudgetLine, WeeklyHoursRow};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn reference() -> Reference {
        Reference::from_as_of(AsOf::from_instant(
            Utc.with_ymd_and_hms(2025, 2, 16, 23, 59, 59).unwrap(),
        ))
    }

    fn monday(weeks_after_start: i64) -> WeekStart {
        WeekStart::of(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap() + Duration::weeks(weeks_after_start))
    }

    fn row(week: i64, planned: f64, actual: Option<f64>) -> WeeklyHoursRow {
        WeeklyHoursRow {
            week_start: monday(week),
            person: "Avery Lee".to_string(),
            planned_hours: planned,
            actual_hours: actual,
            rate: 100.0,
        }
    }

    fn project(name: &str, rows: Vec<WeeklyHoursRow>, high_hours: f64) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            span: ProjectSpan::new(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), None),
            weekly_rows: rows,
            budget_lines: vec![BudgetLine {
                line_type: "labor".to_string(),
                label: "Delivery".to_string(),
                low_hours: high_hours * 0.8,
                high_hours,
                low_dollars: high_hours * 80.0,
                high_dollars: high_hours * 100.0,
            }],
        }
    }

    fn healthy_rows() -> Vec<WeeklyHoursRow> {
        (0..6).map(|week| row(week, 40.0, Some(40.0))).collect()
    }

    fn labels(risks: &[RiskTag]) -> Vec<String> {
        risks.iter().map(|risk| risk.to_string()).collect()
    }

    #[test]
    fn default_labels_match_dashboard_text() {
        let thresholds = RiskThresholds::default();
        assert_eq!(RiskTag::ActualsMissing.to_string(), "Actuals missing");
        assert_eq!(RiskTag::LowBuffer.to_string(), "Low buffer");
        assert_eq!(
            RiskTag::RecentRecoveryLow {
                weeks: 4,
                threshold: thresholds.recovery_percent
            }
            .to_string(),
            "Previous 4 weeks recovery < 80%"
        );
        assert_eq!(
            RiskTag::OverallRecoveryLow {
                threshold: thresholds.recovery_percent
            }
            .to_string(),
            "Overall recovery < 80%"
        );
    }

    #[test]
    fn healthy_project_is_excluded() {
        let projects = vec![project("Harbor", healthy_rows(), 400.0)];
        let at_risk = evaluate_portfolio(&projects, &reference(), &EngineConfig::default());
        assert!(at_risk.is_empty());
    }

    #[test]
    fn missing_actuals_and_low_buffer() {
        let mut rows = healthy_rows();
        rows[5].actual_hours = None;
        rows.push(row(6, 40.0, None));
        let projects = vec![project("Beacon", rows, 250.0)];

        let at_risk = evaluate_portfolio(&projects, &reference(), &EngineConfig::default());

        assert_eq!(at_risk.len(), 1);
        assert_eq!(
            labels(&at_risk[0].risks),
            vec![
                "Actuals missing",
                "Low buffer",
                "Previous 4 weeks recovery < 80%",
            ]
        );
    }

    #[test]
    fn over_budget_forecast_has_negative_buffer() {
        let projects = vec![project("Summit", healthy_rows(), 200.0)];
        let rollup = budget::rollup_project(&projects[0], &reference());
        let buffer = buffer_percent(&rollup).expect("envelope is non-zero");
        assert!(buffer < 0.0);

        let at_risk = evaluate_portfolio(&projects, &reference(), &EngineConfig::default());
        assert_eq!(labels(&at_risk[0].risks), vec!["Low buffer"]);
    }

    #[test]
    fn recovery_rules_fire_independently() {
        let rows = vec![
            row(0, 40.0, Some(10.0)),
            row(1, 40.0, Some(10.0)),
            row(2, 40.0, Some(40.0)),
            row(3, 40.0, Some(40.0)),
            row(4, 40.0, Some(40.0)),
            row(5, 40.0, Some(40.0)),
        ];
        let projects = vec![project("Cedar", rows, 1000.0)];

        let at_risk = evaluate_portfolio(&projects, &reference(), &EngineConfig::default());

        assert_eq!(labels(&at_risk[0].risks), vec!["Overall recovery < 80%"]);
    }

    #[test]
    fn null_recovery_weeks_are_skipped() {
        let points = vec![
            RecoveryPoint::new("2025-01-20".to_string(), 0.0, 0.0),
            RecoveryPoint::new("2025-01-27".to_string(), 4000.0, 2000.0),
            RecoveryPoint::new("2025-02-03".to_string(), 4000.0, 4000.0),
        ];
        assert_eq!(average_recovery(&points), Some(75.0));
        assert_eq!(average_recovery(&points[..1]), None);
    }

    #[test]
    fn empty_envelope_skips_buffer_rule() {
        let mut unbudgeted = project("Delta", healthy_rows(), 0.0);
        unbudgeted.budget_lines.clear();
        let at_risk = evaluate_portfolio(&[unbudgeted], &reference(), &EngineConfig::default());
        assert!(at_risk.is_empty());
    }

    #[test]
    fn inactive_projects_are_skipped() {
        let mut finished = project("Ember", healthy_rows(), 100.0);
        finished.span.end_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let at_risk = evaluate_portfolio(&[finished], &reference(), &EngineConfig::default());
        assert!(at_risk.is_empty());
    }

    #[test]
    fn portfolio_sorts_by_risk_count() {
        let mut missing = healthy_rows();
        missing[4].actual_hours = None;
        let projects = vec![
            project("Alpha", healthy_rows(), 200.0),
            project("Bravo", missing, 200.0),
        ];

        let at_risk = evaluate_portfolio(&projects, &reference(), &EngineConfig::default());

        let names: Vec<&str> = at_risk.iter().map(|item| item.project_name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Alpha"]);
    }

    #[test]
    fn tags_serialize_as_labels() {
        let json = serde_json::to_string(&vec![RiskTag::ActualsMissing, RiskTag::LowBuffer]).unwrap();
        assert_eq!(json, r#"["Actuals missing","Low buffer"]"#);
    }
}
