//! Core of mailsift
//!
//! Ties the token exchange, the IMAP session and the message decoder
//! together behind [`MailClient`].

mod account;
mod client;
mod error;
mod search;

pub use account::{AccountConfig, Credentials};
pub use client::MailClient;
pub use error::{CoreError, CoreResult};
pub use search::{MessageStream, SearchCoordinator};

pub use mailsift_imap::{MessageRecord, SearchQuery};
