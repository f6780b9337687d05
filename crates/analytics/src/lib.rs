//! Campaign data: synthetic generation, flat-file storage and exploratory
//! summaries.

pub mod dataset;
pub mod generator;
pub mod summary;

pub use generator::CampaignDataGenerator;
pub use summary::DatasetSummary;
