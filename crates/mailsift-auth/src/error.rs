//! Error types for the auth module

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during authentication
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential was empty
    #[error("Missing credential: {0} must not be empty")]
    InvalidInput(&'static str),

    /// Invalid endpoint configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Refresh-token exchange failed (network, HTTP status, or response body)
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}
