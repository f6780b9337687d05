use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A pipeline stage was requested before the stage it depends on.
    /// Recoverable: the operator is told which stage to run first.
    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CampaignError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CampaignError::PrerequisiteMissing(_))
    }
}

impl From<config::ConfigError> for CampaignError {
    fn from(err: config::ConfigError) -> Self {
        CampaignError::Config(err.to_string())
    }
}
