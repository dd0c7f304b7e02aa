//! Error types for IMAP operations

use thiserror::Error;

/// Result type for raw IMAP transport operations
pub type ImapResult<T> = Result<T, ImapError>;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for message decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors reported by the IMAP transport
#[derive(Debug, Error)]
pub enum ImapError {
    /// Connection failed
    #[error("Failed to connect to IMAP server: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("IMAP authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server returned an error
    #[error("IMAP server error: {0}")]
    ServerError(String),

    /// Folder not found
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// Message not found
    #[error("Message not found: UID {0}")]
    MessageNotFound(u32),

    /// Parse error
    #[error("Failed to parse IMAP response: {0}")]
    ParseError(String),

    /// TLS error
    #[error("TLS error: {0}")]
    TlsError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Session is not connected
    #[error("IMAP session is not connected")]
    NotConnected,
}

impl ImapError {
    /// Whether the underlying connection is gone after this error
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            ImapError::ConnectionFailed(_)
                | ImapError::TlsError(_)
                | ImapError::IoError(_)
                | ImapError::NotConnected
        )
    }
}

/// Errors from an authenticated session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connect, TLS handshake or XOAUTH2 exchange failed
    #[error("Login failed: {0}")]
    LoginFailed(#[source] ImapError),

    /// SELECT was rejected
    #[error("Failed to select mailbox {mailbox}: {source}")]
    MailboxSelectFailed {
        mailbox: String,
        #[source]
        source: ImapError,
    },

    /// UID SEARCH was rejected
    #[error("Search failed in {mailbox}: {source}")]
    SearchFailed {
        mailbox: String,
        #[source]
        source: ImapError,
    },

    /// UID FETCH was rejected or returned no body
    #[error("Failed to fetch UID {uid}: {source}")]
    FetchFailed {
        uid: u32,
        #[source]
        source: ImapError,
    },

    /// Search or fetch issued before any mailbox was selected
    #[error("No mailbox selected")]
    NoMailboxSelected,

    /// Message id obtained under a different mailbox selection
    #[error("Message id UID {uid} belongs to a previous mailbox selection")]
    StaleMessageId { uid: u32 },

    /// Session was logged out or lost its connection
    #[error("IMAP session is closed")]
    Closed,
}

/// Errors from turning a raw message into a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Header block could not be separated from the body
    #[error("Malformed message envelope")]
    MalformedEnvelope,

    /// Declared charset is not known
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Payload bytes are not valid in the declared charset
    #[error("Payload is not valid {0}")]
    InvalidText(String),

    /// Content-Transfer-Encoding could not be reversed
    #[error("Invalid {0} payload")]
    InvalidTransferEncoding(String),
}
