//! Top-level mail client

use crate::{AccountConfig, CoreResult, Credentials, MessageStream, SearchCoordinator};
use mailsift_auth::{OAuth2TokenExchanger, TokenExchanger};
use mailsift_imap::{AuthenticatedSession, ImapClient, MailBackend, MessageRecord};
use tracing::info;

/// A logged-in account, ready to search
pub struct MailClient<B: MailBackend = ImapClient> {
    coordinator: SearchCoordinator<B>,
}

impl MailClient<ImapClient> {
    /// Exchange the refresh token, log in and select the inbox
    pub async fn connect(credentials: &Credentials, config: &AccountConfig) -> CoreResult<Self> {
        let exchanger = OAuth2TokenExchanger::new(&config.oauth2())?;
        Self::connect_with(&exchanger, credentials, config).await
    }

    /// Like [`MailClient::connect`] with a caller-supplied token exchanger
    pub async fn connect_with<E>(
        exchanger: &E,
        credentials: &Credentials,
        config: &AccountConfig,
    ) -> CoreResult<Self>
    where
        E: TokenExchanger + ?Sized,
    {
        let access_token = exchanger
            .exchange(&credentials.client_id, &credentials.refresh_token)
            .await?;

        let session = AuthenticatedSession::login(
            &config.imap_host,
            config.imap_port,
            &credentials.account_address,
            &access_token,
        )
        .await?;

        info!("Logged in as {}", credentials.account_address);
        Ok(Self::from_session(session, config.mailboxes.clone()))
    }
}

impl<B: MailBackend> MailClient<B> {
    /// Wrap an already authenticated session
    pub fn from_session(session: AuthenticatedSession<B>, mailboxes: Vec<String>) -> Self {
        Self {
            coordinator: SearchCoordinator::new(session, mailboxes),
        }
    }

    pub fn fetch_all(&mut self) -> MessageStream<'_> {
        self.coordinator.fetch_all()
    }

    pub fn fetch_from_sender(&mut self, sender: &str) -> CoreResult<MessageStream<'_>> {
        self.coordinator.fetch_from_sender(sender)
    }

    pub fn fetch_since_date(&mut self, date: &str) -> CoreResult<MessageStream<'_>> {
        self.coordinator.fetch_since_date(date)
    }

    pub async fn fetch_by_subject(&mut self, text: &str) -> CoreResult<Option<MessageRecord>> {
        self.coordinator.fetch_by_subject(text).await
    }

    pub async fn fetch_by_body(&mut self, text: &str) -> CoreResult<Option<MessageRecord>> {
        self.coordinator.fetch_by_body(text).await
    }

    pub async fn logout(&mut self) -> CoreResult<()> {
        self.coordinator.logout().await
    }
}
