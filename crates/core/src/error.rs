//! Error types for the BananaFit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; the workflow
//! coordinator recovers all of them and turns them into user-visible notices.

use thiserror::Error;

/// The top-level error type for all BananaFit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Encoder errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    // --- Gateway errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A remote image URL could not be turned into an inline image.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an image (content type: {content_type})")]
    NotAnImage { url: String, content_type: String },

    #[error("{url} exceeds the {limit}-byte image limit")]
    TooLarge { url: String, limit: usize },
}

/// A local file could not be turned into an inline image.
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("Failed to read {name}: {reason}")]
    Read { name: String, reason: String },

    #[error("{0} is empty")]
    Empty(String),

    #[error("{name} is not a supported image")]
    NotAnImage { name: String },

    #[error("{name} exceeds the {limit}-byte image limit")]
    TooLarge { name: String, limit: usize },
}

/// A remote generation call failed or produced no image.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by the image model, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No image returned: {0}")]
    NoImage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Image model not configured: {0}")]
    NotConfigured(String),
}
