//! Authenticated session state machine
//!
//! `Ready -> Selected -> Closed`. The selected mailbox lives here rather than
//! only on the server, and every [`MessageId`] remembers which selection
//! produced it.

use crate::{
    ImapClient, ImapError, MailBackend, SearchQuery, SessionError, SessionResult,
};
use mailsift_auth::{AccessToken, XOAuth2Token};
use tracing::{debug, info, warn};

/// Mailbox selected right after login
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Server UID tied to the mailbox selection it came from
///
/// Only [`AuthenticatedSession::search`] hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId {
    uid: u32,
    epoch: u64,
}

impl MessageId {
    /// Server-assigned UID
    pub fn uid(&self) -> u32 {
        self.uid
    }
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Logged in, nothing selected
    Ready,
    /// A mailbox is selected; `epoch` changes on every selection
    Selected { mailbox: String, epoch: u64 },
    /// Logged out or connection lost
    Closed,
}

/// An authenticated mailbox session over some [`MailBackend`]
pub struct AuthenticatedSession<B: MailBackend = ImapClient> {
    backend: B,
    state: SessionState,
    epochs: u64,
}

impl AuthenticatedSession<ImapClient> {
    /// Connect over TLS, authenticate with XOAUTH2 and select the inbox
    pub async fn login(
        host: &str,
        port: u16,
        email: &str,
        access_token: &AccessToken,
    ) -> SessionResult<Self> {
        let mut client = ImapClient::new(host, port);
        client
            .authenticate_xoauth2(XOAuth2Token::new(email, access_token))
            .await
            .map_err(SessionError::LoginFailed)?;

        let mut session = Self::new(client);
        session.select_mailbox(DEFAULT_MAILBOX).await?;
        Ok(session)
    }
}

impl<B: MailBackend> AuthenticatedSession<B> {
    /// Wrap a backend whose connection is already authenticated
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Ready,
            epochs: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Name of the selected mailbox, if any
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            SessionState::Selected { mailbox, .. } => Some(mailbox),
            _ => None,
        }
    }

    /// Underlying transport
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Switch the active mailbox
    ///
    /// After a failed SELECT no mailbox is selected.
    pub async fn select_mailbox(&mut self, name: &str) -> SessionResult<()> {
        self.ensure_open()?;

        match self.backend.select(name).await {
            Ok(exists) => {
                self.epochs += 1;
                self.state = SessionState::Selected {
                    mailbox: name.to_string(),
                    epoch: self.epochs,
                };
                debug!("Mailbox {} selected ({} messages)", name, exists);
                Ok(())
            }
            Err(source) => {
                self.state = SessionState::Ready;
                self.fail(&source);
                Err(SessionError::MailboxSelectFailed {
                    mailbox: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Search the selected mailbox; ids come back in ascending UID order
    pub async fn search(&mut self, query: &SearchQuery) -> SessionResult<Vec<MessageId>> {
        let (mailbox, epoch) = self.selection()?;

        match self.backend.uid_search(&query.to_imap()).await {
            Ok(uids) => {
                debug!("{} matched {} messages in {}", query, uids.len(), mailbox);
                Ok(uids
                    .into_iter()
                    .map(|uid| MessageId { uid, epoch })
                    .collect())
            }
            Err(source) => {
                self.fail(&source);
                Err(SessionError::SearchFailed { mailbox, source })
            }
        }
    }

    /// Full raw message for an id from the current selection
    pub async fn fetch_raw(&mut self, id: MessageId) -> SessionResult<Vec<u8>> {
        let (_, epoch) = self.selection()?;
        if id.epoch != epoch {
            return Err(SessionError::StaleMessageId { uid: id.uid });
        }

        self.backend.fetch_message(id.uid).await.map_err(|source| {
            self.fail(&source);
            SessionError::FetchFailed {
                uid: id.uid,
                source,
            }
        })
    }

    /// Log out; the session is closed afterwards even if LOGOUT fails
    pub async fn logout(&mut self) -> SessionResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.state = SessionState::Closed;

        if let Err(e) = self.backend.logout().await {
            warn!("LOGOUT failed: {}", e);
        }
        info!("Session closed");
        Ok(())
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn selection(&self) -> SessionResult<(String, u64)> {
        match &self.state {
            SessionState::Selected { mailbox, epoch } => Ok((mailbox.clone(), *epoch)),
            SessionState::Ready => Err(SessionError::NoMailboxSelected),
            SessionState::Closed => Err(SessionError::Closed),
        }
    }

    /// A lost connection invalidates the session
    fn fail(&mut self, error: &ImapError) {
        if error.is_connection_lost() {
            warn!("Connection lost: {}", error);
            self.state = SessionState::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImapResult;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory mailboxes keyed by name, each a list of (uid, raw message)
    #[derive(Default)]
    struct FakeBackend {
        mailboxes: HashMap<String, Vec<(u32, Vec<u8>)>>,
        selected: Option<String>,
        criteria: Vec<String>,
        fail_fetch: Option<ImapError>,
        logged_out: bool,
    }

    impl FakeBackend {
        fn with_mailbox(mut self, name: &str, uids: &[u32]) -> Self {
            let messages = uids
                .iter()
                .map(|uid| (*uid, format!("Subject: {}\r\n\r\nbody", uid).into_bytes()))
                .collect();
            self.mailboxes.insert(name.to_string(), messages);
            self
        }
    }

    #[async_trait]
    impl MailBackend for FakeBackend {
        async fn select(&mut self, mailbox: &str) -> ImapResult<u32> {
            match self.mailboxes.get(mailbox) {
                Some(messages) => {
                    self.selected = Some(mailbox.to_string());
                    Ok(messages.len() as u32)
                }
                None => {
                    self.selected = None;
                    Err(ImapError::FolderNotFound(mailbox.to_string()))
                }
            }
        }

        async fn uid_search(&mut self, criteria: &str) -> ImapResult<Vec<u32>> {
            self.criteria.push(criteria.to_string());
            let mailbox = self.selected.as_ref().ok_or(ImapError::NotConnected)?;
            Ok(self.mailboxes[mailbox].iter().map(|(uid, _)| *uid).collect())
        }

        async fn fetch_message(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
            if let Some(e) = self.fail_fetch.take() {
                return Err(e);
            }
            let mailbox = self.selected.as_ref().ok_or(ImapError::NotConnected)?;
            self.mailboxes[mailbox]
                .iter()
                .find(|(u, _)| *u == uid)
                .map(|(_, raw)| raw.clone())
                .ok_or(ImapError::MessageNotFound(uid))
        }

        async fn logout(&mut self) -> ImapResult<()> {
            self.logged_out = true;
            Ok(())
        }
    }

    fn session() -> AuthenticatedSession<FakeBackend> {
        AuthenticatedSession::new(
            FakeBackend::default()
                .with_mailbox("INBOX", &[1, 2, 3])
                .with_mailbox("Junk", &[7]),
        )
    }

    #[tokio::test]
    async fn test_search_requires_selection() {
        let mut session = session();
        assert!(matches!(
            session.search(&SearchQuery::All).await,
            Err(SessionError::NoMailboxSelected)
        ));
    }

    #[tokio::test]
    async fn test_search_and_fetch_in_selected_mailbox() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();
        assert_eq!(session.selected_mailbox(), Some("INBOX"));

        let ids = session
            .search(&SearchQuery::subject("report").unwrap())
            .await
            .unwrap();
        assert_eq!(ids.iter().map(MessageId::uid).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(session.backend.criteria, vec!["SUBJECT \"report\"".to_string()]);

        let raw = session.fetch_raw(ids[2]).await.unwrap();
        assert!(raw.starts_with(b"Subject: 3"));
    }

    #[tokio::test]
    async fn test_ids_are_rejected_after_mailbox_switch() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();
        let ids = session.search(&SearchQuery::All).await.unwrap();

        session.select_mailbox("Junk").await.unwrap();
        assert!(matches!(
            session.fetch_raw(ids[0]).await,
            Err(SessionError::StaleMessageId { uid: 1 })
        ));

        // Reselecting the same mailbox is a new selection as well
        session.select_mailbox("INBOX").await.unwrap();
        assert!(matches!(
            session.fetch_raw(ids[0]).await,
            Err(SessionError::StaleMessageId { uid: 1 })
        ));
    }

    #[tokio::test]
    async fn test_failed_select_clears_selection() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();

        let err = session.select_mailbox("Archive").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::MailboxSelectFailed { ref mailbox, .. } if mailbox == "Archive"
        ));
        assert_eq!(session.state(), &SessionState::Ready);
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();
        let ids = session.search(&SearchQuery::All).await.unwrap();

        session.backend.fail_fetch = Some(ImapError::ServerError("BAD".into()));
        assert!(matches!(
            session.fetch_raw(ids[0]).await,
            Err(SessionError::FetchFailed { uid: 1, .. })
        ));
        // A protocol-level rejection keeps the session usable
        assert!(session.fetch_raw(ids[1]).await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_loss_closes_session() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();
        let ids = session.search(&SearchQuery::All).await.unwrap();

        session.backend.fail_fetch = Some(ImapError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(session.fetch_raw(ids[0]).await.is_err());
        assert!(session.is_closed());
        assert!(matches!(
            session.select_mailbox("INBOX").await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_logout_closes_session() {
        let mut session = session();
        session.select_mailbox("INBOX").await.unwrap();
        session.logout().await.unwrap();

        assert!(session.backend.logged_out);
        assert!(session.is_closed());
        assert!(matches!(
            session.search(&SearchQuery::All).await,
            Err(SessionError::Closed)
        ));
        // Logging out twice is harmless
        session.logout().await.unwrap();
    }
}
