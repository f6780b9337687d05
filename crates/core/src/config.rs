use serde::Deserialize;
use std::path::PathBuf;

/// Root application configuration. Loaded from an optional
/// `campaign-insights.toml` file and environment variables with the prefix
/// `CAMPAIGN_INSIGHTS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub optimiser: OptimiserConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_plots_dir")]
    pub plots_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default = "default_conv_a")]
    pub conv_a: f64,
    #[serde(default = "default_conv_b")]
    pub conv_b: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_revenue_per_conversion_a")]
    pub revenue_per_conversion_a: f64,
    #[serde(default = "default_revenue_per_conversion_b")]
    pub revenue_per_conversion_b: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimiserConfig {
    #[serde(default = "default_cpi_a")]
    pub cpi_a: f64,
    #[serde(default = "default_cpi_b")]
    pub cpi_b: f64,
    #[serde(default = "default_total_budget")]
    pub total_budget: f64,
    #[serde(default = "default_min_share_each")]
    pub min_share_each: f64,
}

// Default functions
fn default_data_path() -> PathBuf {
    PathBuf::from("data/campaigns.csv")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_plots_dir() -> PathBuf {
    PathBuf::from("results/plots")
}
fn default_n_samples() -> usize {
    8000
}
fn default_conv_a() -> f64 {
    0.055
}
fn default_conv_b() -> f64 {
    0.072
}
fn default_seed() -> u64 {
    42
}
fn default_revenue_per_conversion_a() -> f64 {
    100.0
}
fn default_revenue_per_conversion_b() -> f64 {
    120.0
}
fn default_alpha() -> f64 {
    0.05
}
fn default_cpi_a() -> f64 {
    0.025
}
fn default_cpi_b() -> f64 {
    0.03
}
fn default_total_budget() -> f64 {
    10_000.0
}
fn default_min_share_each() -> f64 {
    0.10
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            results_dir: default_results_dir(),
            plots_dir: default_plots_dir(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            conv_a: default_conv_a(),
            conv_b: default_conv_b(),
            seed: default_seed(),
            revenue_per_conversion_a: default_revenue_per_conversion_a(),
            revenue_per_conversion_b: default_revenue_per_conversion_b(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for OptimiserConfig {
    fn default() -> Self {
        Self {
            cpi_a: default_cpi_a(),
            cpi_b: default_cpi_b(),
            total_budget: default_total_budget(),
            min_share_each: default_min_share_each(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            generator: GeneratorConfig::default(),
            analysis: AnalysisConfig::default(),
            optimiser: OptimiserConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional config file and environment
    /// variables. Environment values win over the file.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("campaign-insights")
    }

    /// Same as [`AppConfig::load`] with an explicit config file stem.
    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
