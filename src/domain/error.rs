use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns true for the not-found variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Webhook 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Webhook 'abc' not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_storage_error() {
        let error = DomainError::storage("Failed to list webhooks: connection reset");
        assert_eq!(
            error.to_string(),
            "Storage error: Failed to list webhooks: connection reset"
        );
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_invalid_id_error() {
        let error = DomainError::invalid_id("'xyz' is not a UUID");
        assert_eq!(error.to_string(), "Invalid ID format: 'xyz' is not a UUID");
    }
}
