use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message text cannot be empty")]
    EmptyMessage,

    #[error("message text cannot exceed {max} characters (got {actual})")]
    MessageTooLong { max: usize, actual: usize },

    #[error("full name cannot be empty")]
    EmptyFullName,

    #[error("{field} must be between {min} and {max} characters (got {actual})")]
    FieldLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("{0} is required")]
    Required(&'static str),
}
