pub mod config;
pub mod error;
pub mod experimentation;
pub mod types;

pub use config::AppConfig;
pub use error::{CampaignError, CampaignResult};
pub use experimentation::ExperimentEngine;
