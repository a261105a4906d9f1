use shared::error::ValidationError;
use thiserror::Error;

use crate::gateway::Endpoint;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{endpoint}: credentials rejected")]
    AuthFailure {
        endpoint: Endpoint,
        detail: Option<String>,
    },

    #[error("{endpoint}: {reason}")]
    Transient {
        endpoint: Endpoint,
        status: Option<u16>,
        reason: String,
    },
}

impl FetchError {
    pub fn transient(endpoint: Endpoint, reason: impl Into<String>) -> Self {
        Self::Transient {
            endpoint,
            status: None,
            reason: reason.into(),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure { .. })
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::AuthFailure { endpoint, .. } | Self::Transient { endpoint, .. } => *endpoint,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("chat view is no longer mounted")]
    Detached,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("session expired; sign in again")]
    SessionExpired,

    #[error("{0}")]
    Request(String),
}
