use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by the repositories. Hooks turn these into stored messages.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("{0}")]
    Upload(String),
    #[error("Image not found in service entry")]
    ImageNotFound,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    pub fn query(err: StoreError) -> Self {
        Self::Query(err.to_string())
    }

    pub fn write(err: StoreError) -> Self {
        Self::Write(err.to_string())
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 2001,
            ServiceError::NotFound(_) => 2002,
            ServiceError::ImageNotFound => 2003,
            ServiceError::Upload(_) => 2101,
            ServiceError::Query(_) => 2201,
            ServiceError::Write(_) => 2202,
            ServiceError::Model(_) => 2301,
        }
    }
}
