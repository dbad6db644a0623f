use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("Invariant violation in {context}: {detail}")]
    InvariantViolation { context: String, detail: String },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },

    #[error("Invalid tax table: {0}")]
    InvalidTable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<ValidationErrors> for FinanceError {
    fn from(errors: ValidationErrors) -> Self {
        FinanceError::Validation(errors)
    }
}

impl From<serde_json::Error> for FinanceError {
    fn from(e: serde_json::Error) -> Self {
        FinanceError::SerializationError(e.to_string())
    }
}
