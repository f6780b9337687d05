//! Operator menu. Maps menu choices onto session stages and renders the
//! text shown after each action.

use crate::session::{PipelineOutputs, Session};
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{format_stat, AllocationResult, Analysis, Group};
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::{info, warn};

pub const MENU: &str = "\
==== Marketing Campaign Analysis Menu ====
1. Generate new data
2. Run A/B test analysis
3. Run optimisation (budget allocation)
4. Generate visualisations
5. Generate report
6. Run full pipeline
0. Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    GenerateData,
    RunAnalysis,
    RunOptimisation,
    GenerateVisualisations,
    GenerateReport,
    RunFullPipeline,
    Exit,
}

impl FromStr for MenuAction {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuAction::GenerateData),
            "2" => Ok(MenuAction::RunAnalysis),
            "3" => Ok(MenuAction::RunOptimisation),
            "4" => Ok(MenuAction::GenerateVisualisations),
            "5" => Ok(MenuAction::GenerateReport),
            "6" => Ok(MenuAction::RunFullPipeline),
            "0" => Ok(MenuAction::Exit),
            other => Err(CampaignError::InvalidInput(format!(
                "invalid choice '{other}'"
            ))),
        }
    }
}

/// What the menu loop should do after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Exit,
}

/// Run one menu action against the session and return the text to show.
pub fn execute(session: &mut Session, action: MenuAction) -> CampaignResult<Flow> {
    info!(?action, "Menu action");
    let text = match action {
        MenuAction::GenerateData => {
            session.generate_data()?;
            let mut out = format!(
                "Data generated and saved at {}\n",
                session.config().paths.data_path.display()
            );
            if let Some(summary) = session.dataset_summary() {
                out.push_str(&summary.to_string());
            }
            out
        }
        MenuAction::RunAnalysis => render_analysis(session.run_analysis()?),
        MenuAction::RunOptimisation => render_allocation(session.run_optimisation()?),
        MenuAction::GenerateVisualisations => {
            let paths = session.generate_visualisations()?;
            let dir = &session.config().paths.plots_dir;
            format!("{} plots saved to {}", paths.len(), dir.display())
        }
        MenuAction::GenerateReport => {
            let artifacts = session.generate_report()?;
            format!("Report generated at {}", artifacts.markdown.display())
        }
        MenuAction::RunFullPipeline => {
            let outputs = session.run_full_pipeline()?;
            let mut out = String::new();
            if let Some(analysis) = session.analysis() {
                out.push_str(&render_analysis(analysis));
            }
            if let Some(allocation) = session.allocation() {
                out.push_str(&render_allocation(allocation));
            }
            out.push_str(&render_outputs(&outputs));
            out.push_str("Full pipeline completed.");
            out
        }
        MenuAction::Exit => return Ok(Flow::Exit),
    };
    Ok(Flow::Continue(text))
}

/// Text produced by a sequence of actions, plus the prerequisite that cut it
/// short, if any.
#[derive(Debug, Default)]
pub struct StepsOutcome {
    pub output: Vec<String>,
    pub skipped: Option<CampaignError>,
}

/// Run actions in order. A missing prerequisite stops the sequence and is
/// returned in [`StepsOutcome::skipped`]; any other error propagates.
pub fn run_steps(session: &mut Session, steps: &[MenuAction]) -> CampaignResult<StepsOutcome> {
    let mut outcome = StepsOutcome::default();
    for &action in steps {
        match execute(session, action) {
            Ok(Flow::Continue(text)) => outcome.output.push(text),
            Ok(Flow::Exit) => break,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, ?action, "Remaining steps skipped");
                outcome.skipped = Some(e);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

pub fn render_analysis(analysis: &Analysis) -> String {
    let t = &analysis.test;
    let mut out = String::new();
    let _ = writeln!(out, "A/B Test: Campaign A vs Campaign B");
    let _ = writeln!(
        out,
        "  Conversion A: {:.3}, Conversion B: {:.3}",
        t.conversion_rate_a, t.conversion_rate_b
    );
    let _ = writeln!(
        out,
        "  Z-score: {}, P-value: {}",
        format_stat(t.z_score, 3),
        format_stat(t.p_value, 4)
    );
    if t.is_degenerate() {
        let _ = writeln!(out, "  Degenerate test: both groups have zero variance.");
    } else if t.is_significant(analysis.alpha) {
        let _ = writeln!(out, "  Statistically significant difference!");
    } else {
        let _ = writeln!(out, "  No significant difference (could be random chance).");
    }
    for group in Group::ALL {
        if let Some(ci) = analysis.interval(group) {
            let _ = writeln!(
                out,
                "  CI {group} ({:.0}%): [{:.4}, {:.4}]",
                ci.confidence * 100.0,
                ci.low,
                ci.high
            );
        }
    }
    out
}

pub fn render_allocation(allocation: &AllocationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Optimal allocation ({}): A = {:.2}, B = {:.2} of {:.2}",
        allocation.status,
        allocation.spend(Group::A),
        allocation.spend(Group::B),
        allocation.total_budget
    );
    let _ = writeln!(
        out,
        "  Efficiency A: {:.3}, Efficiency B: {:.3}, expected conversions: {:.1}",
        allocation.efficiency_a, allocation.efficiency_b, allocation.expected_conversions
    );
    out
}

fn render_outputs(outputs: &PipelineOutputs) -> String {
    let mut out = String::new();
    if let Some(path) = &outputs.dataset {
        let _ = writeln!(out, "Dataset: {}", path.display());
    }
    for path in &outputs.charts {
        let _ = writeln!(out, "Plot: {}", path.display());
    }
    if let Some(report) = &outputs.report {
        let _ = writeln!(out, "Report: {}", report.markdown.display());
        let _ = writeln!(out, "Results: {}", report.json.display());
    }
    out
}
