//! Session state. Owns the run state of one operator session and sequences the
//! pipeline stages over it.

use campaign_analytics::{dataset, CampaignDataGenerator, DatasetSummary};
use campaign_core::config::AppConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{AllocationResult, Analysis, Group, Observation};
use campaign_core::ExperimentEngine;
use campaign_reporting::{charts, optimise_budget, BudgetProblem, CampaignReport, ReportArtifacts};
use std::path::PathBuf;
use tracing::info;

/// Every artifact written during a session, most recent per kind.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutputs {
    pub dataset: Option<PathBuf>,
    pub charts: Vec<PathBuf>,
    pub report: Option<ReportArtifacts>,
}

/// Run state carried across menu actions. Created at process start and
/// dropped at exit; each stage fills in its slot.
pub struct Session {
    config: AppConfig,
    engine: ExperimentEngine,
    observations: Option<Vec<Observation>>,
    analysis: Option<Analysis>,
    allocation: Option<AllocationResult>,
    outputs: PipelineOutputs,
}

impl Session {
    pub fn new(config: AppConfig) -> CampaignResult<Self> {
        let engine = ExperimentEngine::new(config.analysis.alpha)?;
        Ok(Self {
            config,
            engine,
            observations: None,
            analysis: None,
            allocation: None,
            outputs: PipelineOutputs::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn observations(&self) -> Option<&[Observation]> {
        self.observations.as_deref()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn allocation(&self) -> Option<&AllocationResult> {
        self.allocation.as_ref()
    }

    pub fn outputs(&self) -> &PipelineOutputs {
        &self.outputs
    }

    pub fn dataset_summary(&self) -> Option<DatasetSummary> {
        self.observations.as_deref().map(DatasetSummary::compute)
    }

    /// Synthesize a fresh dataset and persist it to the configured path.
    /// Results derived from earlier data are discarded.
    pub fn generate_data(&mut self) -> CampaignResult<&[Observation]> {
        let generator = CampaignDataGenerator::new(self.config.generator.clone())?;
        let observations = generator.generate();
        let path = self.config.paths.data_path.clone();
        dataset::save(&observations, &path)?;
        self.outputs.dataset = Some(path);
        Ok(self.replace_observations(observations))
    }

    /// Load the dataset from the configured path.
    pub fn load_data(&mut self) -> CampaignResult<&[Observation]> {
        let path = &self.config.paths.data_path;
        if !path.exists() {
            return Err(CampaignError::PrerequisiteMissing(format!(
                "no data found at {}; generate data first",
                path.display()
            )));
        }
        let observations = dataset::load(path)?;
        Ok(self.replace_observations(observations))
    }

    fn replace_observations(&mut self, observations: Vec<Observation>) -> &[Observation] {
        let had_results = self.analysis.take().is_some() | self.allocation.take().is_some();
        if had_results {
            info!("New dataset in session, previous results cleared");
        }
        self.observations.insert(observations)
    }

    /// Run the A/B test and confidence intervals. Falls back to the dataset
    /// on disk when nothing has been generated in this session.
    pub fn run_analysis(&mut self) -> CampaignResult<&Analysis> {
        if self.observations.is_none() {
            self.load_data()?;
        }
        let observations = self
            .observations
            .as_deref()
            .ok_or_else(|| CampaignError::PrerequisiteMissing("generate data first".into()))?;

        let analysis = self.engine.analyze(observations)?;
        self.allocation = None;
        Ok(self.analysis.insert(analysis))
    }

    /// Split the configured budget using the analysed conversion rates.
    pub fn run_optimisation(&mut self) -> CampaignResult<&AllocationResult> {
        let analysis = self.analysis.as_ref().ok_or_else(|| {
            CampaignError::PrerequisiteMissing("run analysis first (option 2)".into())
        })?;

        let problem = BudgetProblem::from_config(
            analysis.test.conversion_rate_a,
            analysis.test.conversion_rate_b,
            &self.config.optimiser,
        );
        let result = optimise_budget(&problem)?;
        info!(
            spend_a = result.spend(Group::A),
            spend_b = result.spend(Group::B),
            expected_conversions = result.expected_conversions,
            "Optimisation completed"
        );
        Ok(self.allocation.insert(result))
    }

    fn completed_results(&self) -> CampaignResult<(&Analysis, &AllocationResult)> {
        match (&self.analysis, &self.allocation) {
            (Some(analysis), Some(allocation)) => Ok((analysis, allocation)),
            _ => Err(CampaignError::PrerequisiteMissing(
                "run analysis + optimisation first".into(),
            )),
        }
    }

    pub fn generate_visualisations(&mut self) -> CampaignResult<Vec<PathBuf>> {
        let (analysis, allocation) = self.completed_results()?;
        let written = charts::write_charts(analysis, allocation, &self.config.paths.plots_dir)?;
        self.outputs.charts = written.clone();
        Ok(written)
    }

    pub fn generate_report(&mut self) -> CampaignResult<ReportArtifacts> {
        let (analysis, allocation) = self.completed_results()?;
        let report = CampaignReport::new(analysis.clone(), allocation.clone());
        let artifacts = report.write(&self.config.paths.results_dir)?;
        self.outputs.report = Some(artifacts.clone());
        Ok(artifacts)
    }

    /// Generate, analyse, optimise, plot and report in one go.
    pub fn run_full_pipeline(&mut self) -> CampaignResult<PipelineOutputs> {
        info!("Full pipeline started");
        self.generate_data()?;
        self.run_analysis()?;
        self.run_optimisation()?;
        self.generate_visualisations()?;
        self.generate_report()?;
        info!("Full pipeline completed");
        Ok(self.outputs.clone())
    }
}
