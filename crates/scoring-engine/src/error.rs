use credit_core::CreditError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Feature mismatch: model expects {expected} columns, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Invalid training set: {0}")]
    InvalidTrainingSet(String),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

impl From<ScoringError> for CreditError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::ModelNotFitted => CreditError::ModelNotFitted,
            other => CreditError::InvalidData(other.to_string()),
        }
    }
}
