use thiserror::Error;

#[derive(Error, Debug)]
pub enum CreditError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Scoring model has not been fitted")]
    ModelNotFitted,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl CreditError {
    pub fn issuer_not_found(id: i64) -> Self {
        CreditError::NotFound { entity: "Issuer", id }
    }

    pub fn score_not_found(id: i64) -> Self {
        CreditError::NotFound { entity: "Credit score", id }
    }
}
