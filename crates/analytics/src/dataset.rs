//! Flat-file storage for observations.
//!
//! The on-disk layout is a CSV with the header
//! `user_id,campaign,group,age,income,region,impression,ad_spend,converted,revenue`.
//! Only `group` (or its alias `campaign`) and `converted` are required when
//! loading; the remaining columns fall back to defaults.

use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{Group, Observation, Region};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const COLUMNS: [&str; 10] = [
    "user_id",
    "campaign",
    "group",
    "age",
    "income",
    "region",
    "impression",
    "ad_spend",
    "converted",
    "revenue",
];

/// Render observations as CSV text.
pub fn to_csv(observations: &[Observation]) -> String {
    let mut csv = COLUMNS.join(",");
    csv.push('\n');
    for obs in observations {
        let cells = [
            obs.user_id.to_string(),
            obs.group.to_string(),
            obs.group.to_string(),
            obs.age.to_string(),
            obs.income.to_string(),
            obs.region.as_str().to_string(),
            u8::from(obs.impression).to_string(),
            obs.ad_spend.map(|v| format!("{v:.2}")).unwrap_or_default(),
            u8::from(obs.converted).to_string(),
            obs.revenue.map(|v| v.to_string()).unwrap_or_default(),
        ];
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

/// Parse CSV text produced by [`to_csv`] or any file carrying at least the
/// `group` and `converted` columns.
pub fn from_csv(text: &str) -> CampaignResult<Vec<Observation>> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines
        .next()
        .ok_or_else(|| CampaignError::InvalidInput("dataset is empty".into()))?;

    let index: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let group_col = index
        .get("group")
        .or_else(|| index.get("campaign"))
        .copied()
        .ok_or_else(|| CampaignError::InvalidInput("missing 'group' column".into()))?;
    let converted_col = index
        .get("converted")
        .copied()
        .ok_or_else(|| CampaignError::InvalidInput("missing 'converted' column".into()))?;

    let mut observations = Vec::new();
    for (line_no, line) in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let row = Row {
            cells: &cells,
            index: &index,
            line: line_no + 1,
        };

        let group: Group = row.required(group_col)?.parse().map_err(|e| row.error(e))?;
        let converted = parse_flag(row.required(converted_col)?).map_err(|e| row.error(e))?;

        let revenue = row.optional_f64("revenue")?;
        let ad_spend = row.optional_f64("ad_spend")?;
        for (name, value) in [("revenue", revenue), ("ad_spend", ad_spend)] {
            if value.is_some_and(|v| v < 0.0) {
                return Err(row.error(format!("{name} must be non-negative")));
            }
        }

        observations.push(Observation {
            user_id: row.optional_parse("user_id")?.unwrap_or(observations.len() as u64 + 1),
            group,
            converted,
            revenue,
            ad_spend,
            age: row.optional_parse("age")?.unwrap_or_default(),
            income: row.optional_parse("income")?.unwrap_or_default(),
            region: match row.cell("region") {
                Some(v) => v.parse().map_err(|e| row.error(e))?,
                None => Region::default(),
            },
            impression: match row.cell("impression") {
                Some(v) => parse_flag(v).map_err(|e| row.error(e))?,
                None => true,
            },
        });
    }

    debug!(rows = observations.len(), "Parsed observation dataset");
    Ok(observations)
}

/// Write the dataset, creating parent directories as needed.
pub fn save(observations: &[Observation], path: &Path) -> CampaignResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_csv(observations))?;
    info!(path = %path.display(), rows = observations.len(), "Dataset saved");
    Ok(())
}

pub fn load(path: &Path) -> CampaignResult<Vec<Observation>> {
    let text = fs::read_to_string(path)?;
    let observations = from_csv(&text)?;
    info!(path = %path.display(), rows = observations.len(), "Dataset loaded");
    Ok(observations)
}

struct Row<'a> {
    cells: &'a [&'a str],
    index: &'a HashMap<&'a str, usize>,
    line: usize,
}

impl Row<'_> {
    fn error(&self, err: impl std::fmt::Display) -> CampaignError {
        CampaignError::InvalidInput(format!("line {}: {err}", self.line))
    }

    fn required(&self, col: usize) -> CampaignResult<&str> {
        self.cells
            .get(col)
            .copied()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| self.error("missing required value"))
    }

    fn cell(&self, name: &str) -> Option<&str> {
        let col = *self.index.get(name)?;
        self.cells.get(col).copied().filter(|v| !v.is_empty())
    }

    fn optional_parse<T: std::str::FromStr>(&self, name: &str) -> CampaignResult<Option<T>> {
        self.cell(name)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| self.error(format!("invalid {name} '{v}'")))
            })
            .transpose()
    }

    fn optional_f64(&self, name: &str) -> CampaignResult<Option<f64>> {
        self.optional_parse::<f64>(name)
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value {
        "1" | "1.0" | "true" | "True" => Ok(true),
        "0" | "0.0" | "false" | "False" => Ok(false),
        other => Err(format!("expected 0 or 1, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CampaignDataGenerator;
    use campaign_core::config::GeneratorConfig;
    use tempfile::TempDir;

    #[test]
    fn test_csv_preserves_generated_records() {
        let data = CampaignDataGenerator::new(GeneratorConfig {
            n_samples: 300,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate();

        let csv = to_csv(&data);
        assert!(csv.starts_with("user_id,campaign,group,"));
        assert_eq!(csv.lines().count(), 301);

        let parsed = from_csv(&csv).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_minimal_columns() {
        let text = "group,converted\nA,1\nB,0\nB,1\n";
        let parsed = from_csv(text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].group, Group::A);
        assert!(parsed[0].converted);
        assert_eq!(parsed[2].user_id, 3);
        assert!(parsed[1].revenue.is_none());
        assert!(parsed[1].ad_spend.is_none());
    }

    #[test]
    fn test_campaign_column_alias() {
        let text = "campaign,converted\nB,1\n";
        let parsed = from_csv(text).unwrap();
        assert_eq!(parsed[0].group, Group::B);
    }

    #[test]
    fn test_missing_required_column() {
        let err = from_csv("user_id,group\n1,A\n").unwrap_err();
        assert!(err.to_string().contains("converted"));
    }

    #[test]
    fn test_bad_row_reports_line() {
        let err = from_csv("group,converted\nA,1\nZ,0\n").unwrap_err();
        match err {
            CampaignError::InvalidInput(msg) => {
                assert!(msg.starts_with("line 3:"), "unexpected message: {msg}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let err = from_csv("group,converted,revenue\nA,1,-5\n").unwrap_err();
        assert!(matches!(err, CampaignError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(from_csv("").is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("campaigns.csv");
        let data = CampaignDataGenerator::new(GeneratorConfig {
            n_samples: 50,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate();

        save(&data, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, data);
    }
}
