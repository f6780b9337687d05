//! Synthetic A/B campaign data.
//!
//! Each user is assigned to an arm by a fair coin, may or may not have been
//! served an impression, and converts with the arm's rate when served (1%
//! baseline otherwise).

use campaign_core::config::GeneratorConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{Group, Observation, Region};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Probability that a user was actually served an impression.
const IMPRESSION_RATE: f64 = 0.7;
/// Conversion probability for users who never saw the ad.
const BASELINE_CONVERSION: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct CampaignDataGenerator {
    config: GeneratorConfig,
}

impl CampaignDataGenerator {
    pub fn new(config: GeneratorConfig) -> CampaignResult<Self> {
        for (name, rate) in [("conv_a", config.conv_a), ("conv_b", config.conv_b)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CampaignError::InvalidInput(format!(
                    "{name} must lie in [0, 1], got {rate}"
                )));
            }
        }
        if config.revenue_per_conversion_a < 0.0 || config.revenue_per_conversion_b < 0.0 {
            return Err(CampaignError::InvalidInput(
                "revenue per conversion must be non-negative".into(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Produce `n_samples` observations. The same seed always yields the
    /// same dataset.
    pub fn generate(&self) -> Vec<Observation> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let observations: Vec<Observation> = (1..=self.config.n_samples as u64)
            .map(|user_id| self.sample(&mut rng, user_id))
            .collect();

        let conversions = observations.iter().filter(|o| o.converted).count();
        info!(
            n_samples = observations.len(),
            conversions,
            seed = self.config.seed,
            "Synthetic campaign data generated"
        );
        observations
    }

    fn sample(&self, rng: &mut StdRng, user_id: u64) -> Observation {
        let age = rng.gen_range(18..65);
        let income = rng.gen_range(2000..10000);
        let region = if rng.gen_bool(0.5) {
            Region::Urban
        } else {
            Region::Rural
        };
        let group = if rng.gen_bool(0.5) { Group::A } else { Group::B };
        let impression = rng.gen_bool(IMPRESSION_RATE);
        let ad_spend = (rng.gen_range(1.0..10.0_f64) * 100.0).round() / 100.0;

        let (rate, revenue_per_conversion) = match group {
            Group::A => (self.config.conv_a, self.config.revenue_per_conversion_a),
            Group::B => (self.config.conv_b, self.config.revenue_per_conversion_b),
        };
        let p = if impression { rate } else { BASELINE_CONVERSION };
        let converted = rng.gen_bool(p);

        Observation {
            user_id,
            group,
            converted,
            revenue: Some(if converted { revenue_per_conversion } else { 0.0 }),
            ad_spend: Some(ad_spend),
            age,
            income,
            region,
            impression,
        }
    }
}

impl Default for CampaignDataGenerator {
    fn default() -> Self {
        Self {
            config: GeneratorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            n_samples: 2000,
            seed,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let first = CampaignDataGenerator::new(small_config(7)).unwrap().generate();
        let second = CampaignDataGenerator::new(small_config(7)).unwrap().generate();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_different_data() {
        let first = CampaignDataGenerator::new(small_config(1)).unwrap().generate();
        let second = CampaignDataGenerator::new(small_config(2)).unwrap().generate();
        assert_ne!(first, second);
    }

    #[test]
    fn test_field_ranges() {
        let data = CampaignDataGenerator::new(small_config(42)).unwrap().generate();
        assert_eq!(data.len(), 2000);
        assert_eq!(data[0].user_id, 1);
        assert_eq!(data[1999].user_id, 2000);

        for obs in &data {
            assert!((18..65).contains(&obs.age));
            assert!((2000..10000).contains(&obs.income));
            let spend = obs.ad_spend.unwrap();
            assert!((1.0..=10.0).contains(&spend));
            let revenue = obs.revenue.unwrap();
            match (obs.group, obs.converted) {
                (_, false) => assert_eq!(revenue, 0.0),
                (Group::A, true) => assert_eq!(revenue, 100.0),
                (Group::B, true) => assert_eq!(revenue, 120.0),
            }
        }

        assert!(data.iter().any(|o| o.group == Group::A));
        assert!(data.iter().any(|o| o.group == Group::B));
    }

    #[test]
    fn test_certain_conversion_only_with_impression() {
        let config = GeneratorConfig {
            n_samples: 500,
            conv_a: 1.0,
            conv_b: 1.0,
            ..GeneratorConfig::default()
        };
        let data = CampaignDataGenerator::new(config).unwrap().generate();
        assert!(data.iter().filter(|o| o.impression).all(|o| o.converted));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let config = GeneratorConfig {
            conv_b: 1.2,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            CampaignDataGenerator::new(config),
            Err(CampaignError::InvalidInput(_))
        ));
    }
}
