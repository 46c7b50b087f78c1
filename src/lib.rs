//! Budget burn, forecast and revenue recovery rollups for project resourcing.

pub mod budget;
pub mod calendar;
pub mod config;
pub mod error;
pub mod headers;
pub mod input;
pub mod models;
pub mod recovery;
pub mod report;
pub mod risk;
pub mod utilization;

pub use budget::{compute_budget_rollups, BudgetResult};
pub use calendar::{AsOf, ProjectSpan, Reference, WeekClass, WeekStart};
pub use config::EngineConfig;
pub use models::{BudgetLine, Project, WeeklyHoursRow};
pub use recovery::{compute_recovery, RecoveryPoint, RecoverySummary};
pub use risk::{evaluate_portfolio, AtRiskProject, RiskTag};
