use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DoorbotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("storage: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl DoorbotError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::UnknownTimeZone(_) => 500,
            Self::Storage(_) => 500,
            Self::Timeout(_) => 503,
        }
    }

    /// True when the failure happened below the core and a retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout(_))
    }
}
