//! Error types for appfence

use thiserror::Error;

/// Core error type for appfence operations
#[derive(Debug, Error)]
pub enum FenceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),
}

impl FenceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FenceError>;
