//! Domain Errors
//!
//! Error types for domain operations.

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl DomainError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// True for errors caused by the caller rather than the backing store
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = DomainError::Repository("connection refused".to_string());
        assert_eq!(err.to_string(), "Repository error: connection refused");

        let err = DomainError::validation("'sender' is required");
        assert_eq!(err.to_string(), "Validation error: 'sender' is required");
        assert!(err.is_validation());
    }
}
