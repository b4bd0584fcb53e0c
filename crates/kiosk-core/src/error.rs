use thiserror::Error;

/// Application-wide error types for kiosk.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (non-success status, bad URL, unreadable body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// An extraction script threw, returned a non-array, or produced items
    /// that failed shape coercion.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration or settings value.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reason() {
        let err = AppError::ExtractionError("script returned i64".into());
        assert!(err.to_string().contains("script returned i64"));
    }
}
