use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("malformed document {id}: {reason}")]
    Decode { id: String, reason: String },
    #[error("serialization error: {0}")]
    Encode(String),
}

/// A single form-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// Collapse field failures into one `Validation` error.
pub fn check(errors: Vec<FieldError>) -> Result<(), ModelError> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(ModelError::Validation(joined))
}
