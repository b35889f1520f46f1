//! Error types for the gate

use thiserror::Error;

/// Result type alias for the gate
pub type Result<T> = std::result::Result<T, GateError>;

/// Main error type for the gate
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Coordination store errors not tied to a client error
    #[error("Coordination store error: {0}")]
    Store(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown logical model name
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl GateError {
    /// Whether the error indicates the coordination store itself is unusable.
    ///
    /// Admission and release treat these as fatal for the current call; they
    /// are never downgraded to a silent allow.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, GateError::Redis(_) | GateError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = GateError::Config("qpm_limit must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: qpm_limit must be positive"
        );
    }

    #[test]
    fn test_store_error_is_unavailable() {
        let err = GateError::Store("connection refused".to_string());
        assert!(err.is_store_unavailable());
        assert!(!GateError::UnknownModel("x".to_string()).is_store_unavailable());
    }
}
