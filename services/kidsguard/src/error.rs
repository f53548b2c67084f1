//! Error types for the KidsGuard dashboard client

/// Errors that can occur while driving the dashboard
#[derive(Debug, thiserror::Error)]
pub enum KidsGuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with an `{"error": ...}` envelope
    #[error("{0}")]
    Api(String),

    /// Required input was missing; no request was sent
    #[error("{0}")]
    Validation(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, KidsGuardError>;
