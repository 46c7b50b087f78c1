use std::fmt::Write;

use crate::budget::{self, BudgetResult};
use crate::calendar::Reference;
use crate::config::EngineConfig;
use crate::models::Project;
use crate::recovery::{self, RecoverySummary};
use crate::risk::{self, AtRiskProject};
use crate::utilization::{self, Variance};

/// Undefined percentages render as a dash, never 0%.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(percent) => format!("{percent:.1}%"),
        None => "—".to_string(),
    }
}

fn write_budget(output: &mut String, rollup: &BudgetResult) {
    let _ = writeln!(
        output,
        "- Hours to date: {:.1} actual / {:.1} planned",
        rollup.actual_hours_to_date, rollup.planned_hours_to_date
    );
    let _ = writeln!(
        output,
        "- Forecast: {:.1} h (current week {:.1}, future {:.1}), ${:.2}",
        rollup.forecast_hours,
        rollup.projected_current_week_hours,
        rollup.projected_future_weeks_hours,
        rollup.forecast_dollars
    );
    let _ = writeln!(
        output,
        "- Burn (hours): {} of low, {} of high",
        format_percent(rollup.burn.hours_low),
        format_percent(rollup.burn.hours_high)
    );
    let _ = writeln!(
        output,
        "- Remaining hours: {:.1} low / {:.1} high",
        rollup.remaining.hours_low, rollup.remaining.hours_high
    );
    if rollup.forecast_incomplete {
        let weeks: Vec<String> = rollup
            .missing_actual_weeks
            .iter()
            .map(|week| week.short())
            .collect();
        let _ = writeln!(
            output,
            "- Forecast incomplete: actuals missing for {}",
            weeks.join(", ")
        );
    }
}

fn write_recovery(output: &mut String, summary: &RecoverySummary) {
    for point in summary.previous_weeks.iter() {
        let _ = writeln!(
            output,
            "- Week of {}: {} (delta ${:.2})",
            point.period,
            format_percent(point.recovery_percent),
            point.dollars_delta
        );
    }
    let _ = writeln!(
        output,
        "- Previous {} weeks: {}",
        summary.previous_weeks.len(),
        format_percent(summary.previous_weeks_total.recovery_percent)
    );
    let _ = writeln!(
        output,
        "- Overall to date: {}",
        format_percent(summary.to_date.recovery_percent)
    );
}

pub fn build_report(projects: &[&Project], reference: &Reference, config: &EngineConfig) -> String {
    let at_risk: Vec<AtRiskProject> =
        risk::evaluate_portfolio(projects.iter().copied(), reference, config);

    let mut output = String::new();
    let _ = writeln!(output, "# Project Resourcing Forecast");
    let _ = writeln!(
        output,
        "As of {} (current week {})",
        reference.as_of().date(),
        reference.current_week()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## At-Risk Projects");

    if at_risk.is_empty() {
        let _ = writeln!(output, "No projects at risk.");
    } else {
        for item in at_risk.iter() {
            let risks: Vec<String> = item.risks.iter().map(|risk| risk.to_string()).collect();
            let _ = writeln!(output, "- {}: {}", item.project_name, risks.join("; "));
        }
    }

    for project in projects.iter() {
        let rollup = budget::rollup_project(project, reference);
        let summary =
            recovery::recovery_for_project(project, reference, config.recovery.recent_weeks);
        let off_track = utilization::person_week_variances(
            &project.weekly_rows,
            reference,
            &config.resourcing,
        )
        .into_iter()
        .filter(|item| item.variance != Variance::OnTrack)
        .count();

        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", project.name);
        let _ = writeln!(output, "### Budget");
        write_budget(&mut output, &rollup);
        let _ = writeln!(output, "### Recovery");
        write_recovery(&mut output, &summary);
        let _ = writeln!(output, "### Resourcing");
        let _ = writeln!(output, "- Person-weeks outside the planned band: {off_track}");
    }

    output
}
