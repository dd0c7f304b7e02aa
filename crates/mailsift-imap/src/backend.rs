//! Transport seam between the session state machine and the wire protocol

use crate::ImapResult;
use async_trait::async_trait;

/// The IMAP primitives an authenticated session is built on
///
/// Implementations talk to one already-authenticated connection. They do not
/// track which mailbox is selected; [`crate::AuthenticatedSession`] does.
#[async_trait]
pub trait MailBackend: Send {
    /// SELECT a mailbox, returning its message count
    async fn select(&mut self, mailbox: &str) -> ImapResult<u32>;

    /// UID SEARCH in the selected mailbox, in ascending UID order
    async fn uid_search(&mut self, criteria: &str) -> ImapResult<Vec<u32>>;

    /// Full RFC 822 message for one UID in the selected mailbox
    async fn fetch_message(&mut self, uid: u32) -> ImapResult<Vec<u8>>;

    /// Close the connection
    async fn logout(&mut self) -> ImapResult<()>;
}
