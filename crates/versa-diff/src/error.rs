//! Diff error types.

use thiserror::Error;

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;

/// Errors raised before or during a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// An input is larger than the configured comparison limit.
    #[error("content of {size} bytes exceeds maximum comparison size of {limit} bytes")]
    SizeExceeded { size: usize, limit: usize },

    /// Structured input could not be parsed.
    #[error("invalid structured content: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_exceeded_names_both_sizes() {
        let err = DiffError::SizeExceeded {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "content of 2048 bytes exceeds maximum comparison size of 1024 bytes"
        );
    }

    #[test]
    fn invalid_format_displays_reason() {
        let err = DiffError::InvalidFormat("expected value at line 1".to_string());
        assert!(err.to_string().starts_with("invalid structured content"));
    }
}
