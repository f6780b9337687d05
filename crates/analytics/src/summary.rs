//! Exploratory summary of a dataset, printed before the formal test.

use campaign_core::types::{Group, Observation, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProfile {
    pub group: Group,
    pub count: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub mean_ad_spend: f64,
    pub impression_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub groups: Vec<GroupProfile>,
    pub urban: u64,
    pub rural: u64,
    pub mean_age: f64,
    pub mean_income: f64,
}

impl DatasetSummary {
    pub fn compute(observations: &[Observation]) -> Self {
        let groups = Group::ALL
            .iter()
            .filter_map(|&group| {
                let members: Vec<&Observation> =
                    observations.iter().filter(|o| o.group == group).collect();
                if members.is_empty() {
                    return None;
                }
                let count = members.len() as u64;
                let conversions = members.iter().filter(|o| o.converted).count() as u64;
                let spends: Vec<f64> = members.iter().filter_map(|o| o.ad_spend).collect();
                let impressions = members.iter().filter(|o| o.impression).count();
                Some(GroupProfile {
                    group,
                    count,
                    conversions,
                    conversion_rate: conversions as f64 / count as f64,
                    total_revenue: members.iter().filter_map(|o| o.revenue).sum(),
                    mean_ad_spend: mean(&spends),
                    impression_rate: impressions as f64 / count as f64,
                })
            })
            .collect();

        let urban = observations
            .iter()
            .filter(|o| o.region == Region::Urban)
            .count() as u64;
        let ages: Vec<f64> = observations.iter().map(|o| o.age as f64).collect();
        let incomes: Vec<f64> = observations.iter().map(|o| o.income as f64).collect();

        Self {
            rows: observations.len(),
            groups,
            urban,
            rural: observations.len() as u64 - urban,
            mean_age: mean(&ages),
            mean_income: mean(&incomes),
        }
    }

    pub fn group(&self, group: Group) -> Option<&GroupProfile> {
        self.groups.iter().find(|g| g.group == group)
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(
            f,
            "Regions: {} urban / {} rural, mean age {:.1}, mean income {:.0}",
            self.urban, self.rural, self.mean_age, self.mean_income
        )?;
        writeln!(
            f,
            "  {:<6} {:>8} {:>8} {:>10} {:>12} {:>10} {:>10}",
            "group", "count", "conv", "conv_rate", "revenue", "avg_spend", "imp_rate"
        )?;
        for g in &self.groups {
            writeln!(
                f,
                "  {:<6} {:>8} {:>8} {:>10.4} {:>12.2} {:>10.2} {:>10.3}",
                g.group.as_str(),
                g.count,
                g.conversions,
                g.conversion_rate,
                g.total_revenue,
                g.mean_ad_spend,
                g.impression_rate
            )?;
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
