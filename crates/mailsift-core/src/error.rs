//! Error types for the core module

use mailsift_auth::AuthError;
use mailsift_imap::{DecodeError, InvalidQuery, SessionError};
use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Refresh token could not be exchanged
    #[error("Token exchange failed: {0}")]
    AuthExchangeFailed(#[from] AuthError),

    /// Login, select, search or fetch failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Fetched message could not be decoded
    #[error("Failed to decode message: {0}")]
    DecodeFailed(#[from] DecodeError),

    /// Search argument rejected before reaching the server
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] InvalidQuery),
}
