//! Report builder: assembles the analysis and allocation of one run into a
//! markdown document and a JSON results file.

use campaign_core::error::CampaignResult;
use campaign_core::types::{format_stat, AllocationResult, Analysis, Group};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub analysis: Analysis,
    pub allocation: AllocationResult,
}

/// Files produced by [`CampaignReport::write`].
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

// ─── Report Builder ─────────────────────────────────────────────────────────

impl CampaignReport {
    pub fn new(analysis: Analysis, allocation: AllocationResult) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            analysis,
            allocation,
        }
    }

    pub fn verdict(&self) -> &'static str {
        let test = &self.analysis.test;
        if test.is_degenerate() {
            "Test is degenerate (zero pooled variance); no conclusion can be drawn."
        } else if test.is_significant(self.analysis.alpha) {
            "Statistically significant difference between campaigns."
        } else {
            "No significant difference (could be random chance)."
        }
    }

    pub fn to_markdown(&self) -> String {
        let a = &self.analysis;
        let t = &a.test;
        let mut md = String::new();

        let _ = writeln!(md, "# Marketing Campaign A/B Test Report");
        let _ = writeln!(md);
        let _ = writeln!(
            md,
            "_Report {} generated {}_",
            self.report_id,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(md);

        let _ = writeln!(md, "## A/B Test Results");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Metric | Value |");
        let _ = writeln!(md, "|---|---|");
        let _ = writeln!(md, "| Conversion rate A | {:.4} |", t.conversion_rate_a);
        let _ = writeln!(md, "| Conversion rate B | {:.4} |", t.conversion_rate_b);
        let _ = writeln!(md, "| Z-score | {} |", format_stat(t.z_score, 3));
        let _ = writeln!(md, "| P-value | {} |", format_stat(t.p_value, 4));
        let _ = writeln!(md, "| Significance level (alpha) | {} |", a.alpha);
        let _ = writeln!(md);
        let _ = writeln!(md, "**Verdict:** {}", self.verdict());
        let _ = writeln!(md);

        let _ = writeln!(
            md,
            "## Confidence Intervals ({}%)",
            ((1.0 - a.alpha) * 100.0).round()
        );
        let _ = writeln!(md);
        let _ = writeln!(md, "| Group | Estimate | Lower | Upper |");
        let _ = writeln!(md, "|---|---|---|---|");
        for group in Group::ALL {
            if let Some(ci) = a.interval(group) {
                let _ = writeln!(
                    md,
                    "| {group} | {:.4} | {:.4} | {:.4} |",
                    ci.point_estimate, ci.low, ci.high
                );
            }
        }
        let _ = writeln!(md);

        let _ = writeln!(md, "## Group Summary");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Group | Users | Conversions | Failures | Rate | Revenue |");
        let _ = writeln!(md, "|---|---|---|---|---|---|");
        for g in &a.groups {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {:.4} | {:.2} |",
                g.group, g.count, g.conversions, g.failures, g.conversion_rate, g.revenue
            );
        }
        let _ = writeln!(md);

        let alloc = &self.allocation;
        let _ = writeln!(md, "## Budget Optimisation");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Group | Spend | Share | CPI | Efficiency |");
        let _ = writeln!(md, "|---|---|---|---|---|");
        for (group, cpi, eff) in [
            (Group::A, alloc.cpi_a, alloc.efficiency_a),
            (Group::B, alloc.cpi_b, alloc.efficiency_b),
        ] {
            let spend = alloc.spend(group);
            let share = if alloc.total_budget > 0.0 {
                spend / alloc.total_budget * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                md,
                "| {group} | {spend:.2} | {share:.1}% | {cpi} | {eff:.3} |"
            );
        }
        let _ = writeln!(md);
        let _ = writeln!(md, "- Total budget: {:.2}", alloc.total_budget);
        let _ = writeln!(
            md,
            "- Expected conversions: {:.1}",
            alloc.expected_conversions
        );
        let _ = writeln!(md, "- Solver status: {}", alloc.status);
        md
    }

    pub fn to_json(&self) -> CampaignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `report.md` and `results.json` into `dir`.
    pub fn write(&self, dir: &Path) -> CampaignResult<ReportArtifacts> {
        fs::create_dir_all(dir)?;
        let markdown = dir.join("report.md");
        let json = dir.join("results.json");
        fs::write(&markdown, self.to_markdown())?;
        fs::write(&json, self.to_json()?)?;
        info!(
            report_id = %self.report_id,
            path = %markdown.display(),
            "Report generated"
        );
        Ok(ReportArtifacts { markdown, json })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{
        AllocationStatus, ConfidenceInterval, GroupSummary, TestResult, TestStatus,
    };
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_report(p_value: f64, status: TestStatus) -> CampaignReport {
        let mut cis = BTreeMap::new();
        for (group, p) in [(Group::A, 0.055), (Group::B, 0.072)] {
            cis.insert(
                group,
                ConfidenceInterval {
                    point_estimate: p,
                    low: p - 0.01,
                    high: p + 0.01,
                    confidence: 0.95,
                },
            );
        }
        let mut split = BTreeMap::new();
        split.insert(Group::A, 1_000.0);
        split.insert(Group::B, 9_000.0);

        CampaignReport::new(
            Analysis {
                alpha: 0.05,
                test: TestResult {
                    n_a: 1000,
                    n_b: 1000,
                    conversions_a: 55,
                    conversions_b: 72,
                    conversion_rate_a: 0.055,
                    conversion_rate_b: 0.072,
                    z_score: if status == TestStatus::Degenerate {
                        f64::NAN
                    } else {
                        -1.559
                    },
                    p_value,
                    status,
                },
                confidence_intervals: cis,
                groups: vec![GroupSummary {
                    group: Group::A,
                    count: 1000,
                    conversions: 55,
                    failures: 945,
                    conversion_rate: 0.055,
                    revenue: 5_500.0,
                }],
            },
            AllocationResult {
                allocation: split,
                total_budget: 10_000.0,
                cpi_a: 0.025,
                cpi_b: 0.03,
                efficiency_a: 2.2,
                efficiency_b: 2.4,
                expected_conversions: 23_800.0,
                status: AllocationStatus::Optimal,
            },
        )
    }

    #[test]
    fn test_markdown_sections() {
        let md = make_report(0.119, TestStatus::Computed).to_markdown();
        assert!(md.starts_with("# Marketing Campaign A/B Test Report"));
        assert!(md.contains("## Confidence Intervals (95%)"));
        assert!(md.contains("| Z-score | -1.559 |"));
        assert!(md.contains("No significant difference"));
        assert!(md.contains("| B | 9000.00 | 90.0% |"));
        assert!(md.contains("Expected conversions: 23800.0"));
        assert!(md.contains("Solver status: Optimal"));
    }

    #[test]
    fn test_significant_verdict() {
        let report = make_report(0.01, TestStatus::Computed);
        assert!(report.verdict().starts_with("Statistically significant"));
    }

    #[test]
    fn test_degenerate_verdict_and_nan_rendering() {
        let report = make_report(1.0, TestStatus::Degenerate);
        assert!(report.verdict().contains("degenerate"));
        assert!(report.to_markdown().contains("| Z-score | n/a |"));
    }

    #[test]
    fn test_json_export() {
        let json = make_report(0.119, TestStatus::Computed).to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["allocation"]["status"], "optimal");
        assert_eq!(parsed["allocation"]["allocation"]["B"], 9000.0);
        assert_eq!(parsed["analysis"]["test"]["conversions_b"], 72);
    }

    #[test]
    fn test_degenerate_report_reads_back_from_json() {
        let report = make_report(1.0, TestStatus::Degenerate);
        let json = report.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["analysis"]["test"]["z_score"].is_null());

        let back: CampaignReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.report_id, report.report_id);
        assert!(back.analysis.test.is_degenerate());
        assert!(back.analysis.test.z_score.is_nan());
        assert_eq!(back.analysis.test.p_value, 1.0);
        assert_eq!(back.allocation.spend(Group::B), 9_000.0);
    }

    #[test]
    fn test_write_artifacts() {
        let dir = TempDir::new().unwrap();
        let artifacts = make_report(0.119, TestStatus::Computed)
            .write(dir.path())
            .unwrap();
        assert!(artifacts.markdown.exists());
        assert!(artifacts.json.exists());

        let json = fs::read_to_string(&artifacts.json).unwrap();
        let back: CampaignReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.analysis.test.conversions_a, 55);
    }
}
