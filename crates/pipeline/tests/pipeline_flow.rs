//! Integration test for the full generate → analyse → optimise → report flow.
//! Runs against a scratch directory under the system temp dir.

#[cfg(test)]
mod tests {
    use campaign_analytics::dataset;
    use campaign_core::config::{AppConfig, GeneratorConfig, PathsConfig};
    use campaign_core::types::{AllocationStatus, Group};
    use campaign_core::CampaignError;
    use campaign_pipeline::{run_steps, MenuAction, Session};
    use tempfile::TempDir;

    fn scratch_config(n_samples: usize) -> (AppConfig, TempDir) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let config = AppConfig {
            paths: PathsConfig {
                data_path: root.join("data").join("campaigns.csv"),
                results_dir: root.join("results"),
                plots_dir: root.join("results").join("plots"),
            },
            generator: GeneratorConfig {
                n_samples,
                ..GeneratorConfig::default()
            },
            ..AppConfig::default()
        };
        (config, temp)
    }

    #[test]
    fn test_full_pipeline_writes_every_artifact() {
        let (config, _temp) = scratch_config(4000);
        let mut session = Session::new(config.clone()).unwrap();
        let outputs = session.run_full_pipeline().unwrap();

        let dataset_path = outputs.dataset.as_ref().unwrap();
        assert!(dataset_path.exists());
        assert_eq!(outputs.charts.len(), 3);
        for name in [
            "conversion_rates.svg",
            "optimal_allocation.svg",
            "revenue_by_group.svg",
        ] {
            assert!(config.paths.plots_dir.join(name).exists(), "{name} missing");
        }
        let report = outputs.report.as_ref().unwrap();
        assert!(report.markdown.exists());
        assert!(report.json.exists());

        // The persisted dataset matches what the session analysed.
        let reloaded = dataset::load(dataset_path).unwrap();
        assert_eq!(reloaded.len(), 4000);
        assert_eq!(reloaded.as_slice(), session.observations().unwrap());

        let analysis = session.analysis().unwrap();
        assert_eq!(analysis.test.n_a + analysis.test.n_b, 4000);
        for group in Group::ALL {
            let ci = analysis.interval(group).unwrap();
            assert!(ci.low <= ci.point_estimate && ci.point_estimate <= ci.high);
            let mid = (ci.low + ci.high) / 2.0;
            assert!((mid - ci.point_estimate).abs() < 1e-12);
        }

        let allocation = session.allocation().unwrap();
        let budget = config.optimiser.total_budget;
        let floor = config.optimiser.min_share_each * budget;
        assert_eq!(allocation.status, AllocationStatus::Optimal);
        assert!(allocation.total_spend() <= budget + 1e-9);
        assert!(allocation.spend(Group::A) + 1e-9 >= floor);
        assert!(allocation.spend(Group::B) + 1e-9 >= floor);

        let json = std::fs::read_to_string(&report.json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["allocation"]["status"], "optimal");

    }

    #[test]
    fn test_out_of_order_actions_leave_session_usable() {
        let (config, _temp) = scratch_config(1000);
        let mut session = Session::new(config).unwrap();

        for err in [
            session.run_optimisation().map(|_| ()).unwrap_err(),
            session.generate_visualisations().map(|_| ()).unwrap_err(),
            session.generate_report().map(|_| ()).unwrap_err(),
        ] {
            assert!(matches!(err, CampaignError::PrerequisiteMissing(_)));
        }

        session.generate_data().unwrap();
        session.run_analysis().unwrap();
        session.run_optimisation().unwrap();
        assert!(session.generate_report().is_ok());
    }

    #[test]
    fn test_report_steps_without_dataset_end_with_warning() {
        let (config, _temp) = scratch_config(1000);
        let data_path = config.paths.data_path.clone();
        let mut session = Session::new(config).unwrap();

        let outcome = run_steps(
            &mut session,
            &[
                MenuAction::RunAnalysis,
                MenuAction::RunOptimisation,
                MenuAction::GenerateReport,
            ],
        )
        .unwrap();
        assert!(outcome.output.is_empty());
        assert!(matches!(
            outcome.skipped,
            Some(CampaignError::PrerequisiteMissing(_))
        ));
        assert!(!data_path.exists());
    }

    #[test]
    fn test_same_seed_gives_same_analysis() {
        let (config_a, _temp_a) = scratch_config(2000);
        let (config_b, _temp_b) = scratch_config(2000);

        let mut first = Session::new(config_a).unwrap();
        let mut second = Session::new(config_b).unwrap();
        first.generate_data().unwrap();
        second.generate_data().unwrap();
        let a = first.run_analysis().unwrap().test.clone();
        let b = second.run_analysis().unwrap().test.clone();

        assert_eq!(a.conversions_a, b.conversions_a);
        assert_eq!(a.conversions_b, b.conversions_b);
        assert_eq!(a.z_score.to_bits(), b.z_score.to_bits());
    }
}
