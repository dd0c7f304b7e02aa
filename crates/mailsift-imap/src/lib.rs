//! IMAP side of mailsift
//!
//! XOAUTH2 login over implicit TLS, a session that tracks which mailbox is
//! selected, search criteria, and MIME decoding of fetched messages.

mod backend;
mod client;
mod error;
mod message;
mod mime;
mod oauth2;
mod query;
mod session;

pub use backend::MailBackend;
pub use client::ImapClient;
pub use error::{DecodeError, DecodeResult, ImapError, ImapResult, SessionError, SessionResult};
pub use message::{EmailAddress, MessageRecord};
pub use mime::{decode_message, strip_tags};
pub use oauth2::XOAuth2Authenticator;
pub use query::{imap_date, InvalidQuery, SearchQuery, SearchText};
pub use session::{AuthenticatedSession, MessageId, SessionState, DEFAULT_MAILBOX};
