use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{ProjectSpan, WeekStart};

/// One person's one week on one project.
///
/// `actual_hours = None` means "not yet reported", which is not the same as a
/// reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHoursRow {
    #[serde(rename = "weekStartDate")]
    pub week_start: WeekStart,
    #[serde(default)]
    pub person: String,
    pub planned_hours: f64,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    pub rate: f64,
}

impl WeeklyHoursRow {
    pub fn planned_dollars(&self) -> f64 {
        self.planned_hours * self.rate
    }

    /// Missing actuals count as zero here; callers that must distinguish
    /// check `actual_hours` directly.
    pub fn actual_dollars(&self) -> f64 {
        self.actual_hours.unwrap_or(0.0) * self.rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    #[serde(rename = "type", default)]
    pub line_type: String,
    #[serde(default)]
    pub label: String,
    pub low_hours: f64,
    pub high_hours: f64,
    pub low_dollars: f64,
    pub high_dollars: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub span: ProjectSpan,
    #[serde(default)]
    pub weekly_rows: Vec<WeeklyHoursRow>,
    #[serde(default)]
    pub budget_lines: Vec<BudgetLine>,
}
