//! IMAP client implementation

use crate::{ImapError, ImapResult, MailBackend, XOAuth2Authenticator};
use async_imap::Session;
use async_native_tls::TlsStream;
use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use mailsift_auth::XOAuth2Token;
use tracing::{debug, info};

// Type alias for our TLS stream
type ImapStream = TlsStream<TcpStream>;

/// IMAP client over implicit TLS, authenticated with XOAUTH2
pub struct ImapClient {
    session: Option<Session<ImapStream>>,
    host: String,
    port: u16,
}

impl ImapClient {
    /// Create a new IMAP client
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            session: None,
            host: host.into(),
            port,
        }
    }

    /// Connect and authenticate using XOAUTH2
    pub async fn authenticate_xoauth2(&mut self, token: XOAuth2Token) -> ImapResult<()> {
        info!("Connecting to {}:{}", self.host, self.port);

        let tcp_stream = TcpStream::connect(format!("{}:{}", self.host, self.port))
            .await
            .map_err(|e| ImapError::ConnectionFailed(e.to_string()))?;

        let tls_connector = async_native_tls::TlsConnector::new();
        let tls_stream = tls_connector
            .connect(&self.host, tcp_stream)
            .await
            .map_err(|e| ImapError::TlsError(e.to_string()))?;

        debug!("TLS connection established");

        let client = async_imap::Client::new(tls_stream);

        info!("Authenticating with XOAUTH2 for {}", token.email());

        let session = client
            .authenticate("XOAUTH2", XOAuth2Authenticator::new(token))
            .await
            .map_err(|(e, _)| ImapError::AuthenticationFailed(e.to_string()))?;

        self.session = Some(session);
        info!("XOAUTH2 authentication successful");
        Ok(())
    }

    /// Get the session, returning an error if not connected
    fn session_mut(&mut self) -> ImapResult<&mut Session<ImapStream>> {
        self.session.as_mut().ok_or(ImapError::NotConnected)
    }
}

/// Keep transport failures apart from server rejections
fn command_error(
    error: async_imap::error::Error,
    rejected: impl FnOnce(String) -> ImapError,
) -> ImapError {
    match error {
        async_imap::error::Error::Io(e) => ImapError::IoError(e),
        async_imap::error::Error::ConnectionLost => {
            ImapError::ConnectionFailed("connection lost".to_string())
        }
        other => rejected(other.to_string()),
    }
}

#[async_trait]
impl MailBackend for ImapClient {
    async fn select(&mut self, mailbox: &str) -> ImapResult<u32> {
        let session = self.session_mut()?;

        let selected = session
            .select(mailbox)
            .await
            .map_err(|e| {
                command_error(e, |msg| {
                    ImapError::FolderNotFound(format!("{}: {}", mailbox, msg))
                })
            })?;

        debug!("Selected folder {} with {} messages", mailbox, selected.exists);
        Ok(selected.exists)
    }

    async fn uid_search(&mut self, criteria: &str) -> ImapResult<Vec<u32>> {
        let session = self.session_mut()?;

        let uids = session
            .uid_search(criteria)
            .await
            .map_err(|e| command_error(e, ImapError::ServerError))?;

        // async-imap hands back an unordered set; UIDs grow with arrival.
        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();

        debug!("UID SEARCH {} matched {} messages", criteria, uids.len());
        Ok(uids)
    }

    async fn fetch_message(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
        let session = self.session_mut()?;

        // BODY.PEEK[] leaves \Seen untouched
        let fetches: Vec<_> = session
            .uid_fetch(uid.to_string(), "BODY.PEEK[]")
            .await
            .map_err(|e| command_error(e, ImapError::ServerError))?
            .try_collect()
            .await
            .map_err(|e| command_error(e, ImapError::ParseError))?;

        let body = fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .ok_or(ImapError::MessageNotFound(uid))?;

        debug!("Fetched UID {}: {} bytes", uid, body.len());
        Ok(body.to_vec())
    }

    async fn logout(&mut self) -> ImapResult<()> {
        if let Some(mut session) = self.session.take() {
            session
                .logout()
                .await
                .map_err(|e| ImapError::ServerError(e.to_string()))?;
        }
        Ok(())
    }
}
