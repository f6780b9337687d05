use crate::error::CampaignError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Experiment arm an observation was assigned to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    A,
    B,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::A, Group::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::A => "A",
            Group::B => "B",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Group::A),
            "B" | "b" => Ok(Group::B),
            other => Err(CampaignError::InvalidInput(format!(
                "unknown group '{other}', expected A or B"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Urban,
    Rural,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Urban => "Urban",
            Region::Rural => "Rural",
        }
    }
}

impl FromStr for Region {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Urban" => Ok(Region::Urban),
            "Rural" => Ok(Region::Rural),
            other => Err(CampaignError::InvalidInput(format!("unknown region '{other}'"))),
        }
    }
}

/// One user exposed to a campaign arm. Immutable once generated or loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub user_id: u64,
    pub group: Group,
    pub converted: bool,
    pub revenue: Option<f64>,
    pub ad_spend: Option<f64>,
    // Demographics; not used by the statistics or the optimiser.
    pub age: u32,
    pub income: u32,
    pub region: Region,
    pub impression: bool,
}

/// Per-group aggregate recomputed on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: Group,
    pub count: u64,
    pub conversions: u64,
    pub failures: u64,
    pub conversion_rate: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Computed,
    /// Pooled standard error was zero (both arms at 0% or both at 100%).
    /// The z-score is NaN and the p-value pinned to 1.0.
    Degenerate,
}

/// Outcome of the pooled two-proportion z-test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub n_a: u64,
    pub n_b: u64,
    pub conversions_a: u64,
    pub conversions_b: u64,
    pub conversion_rate_a: f64,
    pub conversion_rate_b: f64,
    /// NaN when degenerate; exported as `null`.
    #[serde(with = "nan_as_null")]
    pub z_score: f64,
    pub p_value: f64,
    pub status: TestStatus,
}

impl TestResult {
    pub fn is_degenerate(&self) -> bool {
        self.status == TestStatus::Degenerate
    }

    /// Degenerate tests are never significant.
    pub fn is_significant(&self, alpha: f64) -> bool {
        !self.is_degenerate() && self.p_value < alpha
    }

    pub fn conversion_rate(&self, group: Group) -> f64 {
        match group {
            Group::A => self.conversion_rate_a,
            Group::B => self.conversion_rate_b,
        }
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Render a statistic for display. Non-finite values (the NaN z-score of a
/// degenerate test) become "n/a".
pub fn format_stat(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        "n/a".to_string()
    }
}

/// Wald interval around one group's conversion rate. Bounds are not
/// clipped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub point_estimate: f64,
    pub low: f64,
    pub high: f64,
    pub confidence: f64,
}

impl ConfidenceInterval {
    pub fn margin(&self) -> f64 {
        (self.high - self.low) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Everything one analysis stage produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub alpha: f64,
    pub test: TestResult,
    pub confidence_intervals: BTreeMap<Group, ConfidenceInterval>,
    pub groups: Vec<GroupSummary>,
}

impl Analysis {
    pub fn interval(&self, group: Group) -> Option<&ConfidenceInterval> {
        self.confidence_intervals.get(&group)
    }

    pub fn summary(&self, group: Group) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.group == group)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Optimal,
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStatus::Optimal => f.write_str("Optimal"),
        }
    }
}

/// Budget split across the two arms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub allocation: BTreeMap<Group, f64>,
    pub total_budget: f64,
    pub cpi_a: f64,
    pub cpi_b: f64,
    pub efficiency_a: f64,
    pub efficiency_b: f64,
    pub expected_conversions: f64,
    pub status: AllocationStatus,
}

impl AllocationResult {
    pub fn spend(&self, group: Group) -> f64 {
        self.allocation.get(&group).copied().unwrap_or(0.0)
    }

    pub fn total_spend(&self) -> f64 {
        self.allocation.values().sum()
    }
}
