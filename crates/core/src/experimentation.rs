//! A/B statistics: per-group summaries, pooled two-proportion z-test and
//! Wald confidence intervals.

use crate::error::{CampaignError, CampaignResult};
use crate::types::{
    Analysis, ConfidenceInterval, Group, GroupSummary, Observation, TestResult, TestStatus,
};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_ALPHA: f64 = 0.05;

/// Stateless statistics engine for a two-arm experiment.
#[derive(Debug, Clone)]
pub struct ExperimentEngine {
    alpha: f64,
    normal: Normal,
}

impl ExperimentEngine {
    pub fn new(alpha: f64) -> CampaignResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(CampaignError::InvalidInput(format!(
                "alpha must lie in (0, 1), got {alpha}"
            )));
        }
        Ok(Self {
            alpha,
            normal: Normal::standard(),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Run the full analysis stage: group table, z-test and both intervals.
    pub fn analyze(&self, observations: &[Observation]) -> CampaignResult<Analysis> {
        let groups = summarize_groups(observations);
        let test = self.test_from_summaries(&groups)?;
        let confidence_intervals = self.intervals_from_summaries(&groups)?;

        info!(
            conv_rate_a = test.conversion_rate_a,
            conv_rate_b = test.conversion_rate_b,
            z_score = test.z_score,
            p_value = test.p_value,
            significant = test.is_significant(self.alpha),
            "A/B test completed"
        );

        Ok(Analysis {
            alpha: self.alpha,
            test,
            confidence_intervals,
            groups,
        })
    }

    /// Pooled two-proportion z-test of A against B.
    pub fn run_ab_test(&self, observations: &[Observation]) -> CampaignResult<TestResult> {
        self.test_from_summaries(&summarize_groups(observations))
    }

    fn test_from_summaries(&self, groups: &[GroupSummary]) -> CampaignResult<TestResult> {
        let a = require_group(groups, Group::A)?;
        let b = require_group(groups, Group::B)?;
        Ok(self.z_test(a.conversions, a.count, b.conversions, b.count))
    }

    /// Z-test from raw counts. Callers must ensure both counts are non-zero.
    fn z_test(&self, conv_a: u64, n_a: u64, conv_b: u64, n_b: u64) -> TestResult {
        let (na, nb) = (n_a as f64, n_b as f64);
        let p1 = conv_a as f64 / na;
        let p2 = conv_b as f64 / nb;
        let p_pool = (conv_a + conv_b) as f64 / (na + nb);
        let se = (p_pool * (1.0 - p_pool) * (1.0 / na + 1.0 / nb)).sqrt();

        let (z_score, p_value, status) = if se > 0.0 {
            let z = (p1 - p2) / se;
            let p = 2.0 * (1.0 - self.normal.cdf(z.abs()));
            (z, p, TestStatus::Computed)
        } else {
            warn!(p_pool, "Pooled standard error is zero, test is degenerate");
            (f64::NAN, 1.0, TestStatus::Degenerate)
        };

        debug!(p1, p2, p_pool, se, "z-test inputs");

        TestResult {
            n_a,
            n_b,
            conversions_a: conv_a,
            conversions_b: conv_b,
            conversion_rate_a: p1,
            conversion_rate_b: p2,
            z_score,
            p_value,
            status,
        }
    }

    /// Unclipped Wald interval for each group at `1 - alpha` confidence.
    pub fn confidence_intervals(
        &self,
        observations: &[Observation],
    ) -> CampaignResult<BTreeMap<Group, ConfidenceInterval>> {
        self.intervals_from_summaries(&summarize_groups(observations))
    }

    fn intervals_from_summaries(
        &self,
        groups: &[GroupSummary],
    ) -> CampaignResult<BTreeMap<Group, ConfidenceInterval>> {
        let critical = self.critical_value();
        let mut intervals = BTreeMap::new();
        for group in Group::ALL {
            let summary = require_group(groups, group)?;
            let n = summary.count as f64;
            let p_hat = summary.conversion_rate;
            let margin = critical * (p_hat * (1.0 - p_hat) / n).sqrt();
            intervals.insert(
                group,
                ConfidenceInterval {
                    point_estimate: p_hat,
                    low: p_hat - margin,
                    high: p_hat + margin,
                    confidence: 1.0 - self.alpha,
                },
            );
        }
        Ok(intervals)
    }

    /// `z_(1 - alpha/2)`.
    pub fn critical_value(&self) -> f64 {
        self.normal.inverse_cdf(1.0 - self.alpha / 2.0)
    }
}

impl Default for ExperimentEngine {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            normal: Normal::standard(),
        }
    }
}

/// Aggregate observations per group. Groups with no observations are
/// omitted rather than reported with an undefined rate.
pub fn summarize_groups(observations: &[Observation]) -> Vec<GroupSummary> {
    let mut totals: BTreeMap<Group, (u64, u64, f64)> = BTreeMap::new();
    for obs in observations {
        let entry = totals.entry(obs.group).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if obs.converted {
            entry.1 += 1;
        }
        entry.2 += obs.revenue.unwrap_or(0.0);
    }

    totals
        .into_iter()
        .map(|(group, (count, conversions, revenue))| GroupSummary {
            group,
            count,
            conversions,
            failures: count - conversions,
            conversion_rate: conversions as f64 / count as f64,
            revenue,
        })
        .collect()
}

fn require_group(groups: &[GroupSummary], group: Group) -> CampaignResult<&GroupSummary> {
    groups
        .iter()
        .find(|s| s.group == group && s.count > 0)
        .ok_or_else(|| {
            CampaignError::InsufficientData(format!("group {group} has no observations"))
        })
}
