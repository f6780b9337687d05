//! Campaign reporting: budget optimisation, charts and the run report.

pub mod budget;
pub mod charts;
pub mod report_builder;

pub use budget::{optimise_budget, BudgetProblem};
pub use report_builder::{CampaignReport, ReportArtifacts};
