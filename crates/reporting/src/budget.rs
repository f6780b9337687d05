//! Budget allocation across the two campaign arms.
//!
//! Maximises `eff_A * x_A + eff_B * x_B` subject to `x_A + x_B <= budget`
//! and per-arm minimum shares. With a linear objective and a single budget
//! row the optimum is greedy: satisfy both floors, then hand the remainder
//! to the arm with the higher conversions-per-dollar.

use campaign_core::config::OptimiserConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{AllocationResult, AllocationStatus, Group};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs to one optimisation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetProblem {
    pub conversion_rate_a: f64,
    pub conversion_rate_b: f64,
    pub cpi_a: f64,
    pub cpi_b: f64,
    pub total_budget: f64,
    /// Fraction of the budget each arm must receive, in `[0, 0.5]`.
    pub min_share_each: f64,
}

impl BudgetProblem {
    pub fn from_config(
        conversion_rate_a: f64,
        conversion_rate_b: f64,
        config: &OptimiserConfig,
    ) -> Self {
        Self {
            conversion_rate_a,
            conversion_rate_b,
            cpi_a: config.cpi_a,
            cpi_b: config.cpi_b,
            total_budget: config.total_budget,
            min_share_each: config.min_share_each,
        }
    }

    /// Conversions gained per unit of budget for an arm.
    pub fn efficiency(&self, group: Group) -> f64 {
        match group {
            Group::A => self.conversion_rate_a / self.cpi_a,
            Group::B => self.conversion_rate_b / self.cpi_b,
        }
    }

    fn validate(&self) -> CampaignResult<()> {
        for (name, cpi) in [("cpi_a", self.cpi_a), ("cpi_b", self.cpi_b)] {
            if !(cpi.is_finite() && cpi > 0.0) {
                return Err(CampaignError::InvalidInput(format!(
                    "{name} must be positive, got {cpi}"
                )));
            }
        }
        if !(self.total_budget.is_finite() && self.total_budget >= 0.0) {
            return Err(CampaignError::InvalidInput(format!(
                "total_budget must be non-negative, got {}",
                self.total_budget
            )));
        }
        for (name, rate) in [
            ("conversion_rate_a", self.conversion_rate_a),
            ("conversion_rate_b", self.conversion_rate_b),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CampaignError::InvalidInput(format!(
                    "{name} must lie in [0, 1], got {rate}"
                )));
            }
        }
        if self.min_share_each.is_nan() || self.min_share_each < 0.0 {
            return Err(CampaignError::InvalidInput(format!(
                "min_share_each must be non-negative, got {}",
                self.min_share_each
            )));
        }
        if self.min_share_each > 0.5 {
            return Err(CampaignError::InfeasibleConstraints(format!(
                "min_share_each {} leaves each arm more than half of the budget",
                self.min_share_each
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Optimiser
// ---------------------------------------------------------------------------

/// Closed-form solution of the two-arm allocation program.
pub fn optimise_budget(problem: &BudgetProblem) -> CampaignResult<AllocationResult> {
    problem.validate()?;

    let efficiency_a = problem.efficiency(Group::A);
    let efficiency_b = problem.efficiency(Group::B);

    let floor = problem.min_share_each * problem.total_budget;
    let remainder = (problem.total_budget - 2.0 * floor).max(0.0);

    // Ties go to A.
    let winner = if efficiency_a >= efficiency_b {
        Group::A
    } else {
        Group::B
    };
    let (spend_a, spend_b) = match winner {
        Group::A => (floor + remainder, floor),
        Group::B => (floor, floor + remainder),
    };

    let expected_conversions = spend_a / problem.cpi_a * problem.conversion_rate_a
        + spend_b / problem.cpi_b * problem.conversion_rate_b;

    debug!(
        efficiency_a,
        efficiency_b,
        winner = %winner,
        floor,
        remainder,
        "Budget allocated"
    );

    let mut allocation = BTreeMap::new();
    allocation.insert(Group::A, spend_a);
    allocation.insert(Group::B, spend_b);

    Ok(AllocationResult {
        allocation,
        total_budget: problem.total_budget,
        cpi_a: problem.cpi_a,
        cpi_b: problem.cpi_b,
        efficiency_a,
        efficiency_b,
        expected_conversions,
        status: AllocationStatus::Optimal,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
