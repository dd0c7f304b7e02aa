//! Account credentials and server configuration

use mailsift_auth::{outlook, OAuth2Config};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What is needed to log in to one mailbox
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth2 application (client) id
    pub client_id: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Mailbox address, used as the XOAUTH2 user
    pub account_address: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
        account_address: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            refresh_token: refresh_token.into(),
            account_address: account_address.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("refresh_token", &"[redacted]")
            .field("account_address", &self.account_address)
            .finish()
    }
}

/// Server and search configuration
///
/// Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// IMAP server hostname
    pub imap_host: String,
    /// IMAP server port (implicit TLS)
    pub imap_port: u16,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// OAuth2 authorization endpoint
    pub auth_url: String,
    /// Mailboxes searched, in order
    pub mailboxes: Vec<String>,
}

impl AccountConfig {
    /// Outlook / Office 365 configuration
    pub fn outlook() -> Self {
        Self {
            imap_host: outlook::IMAP_HOST.to_string(),
            imap_port: outlook::IMAP_PORT,
            token_url: outlook::TOKEN_URL.to_string(),
            auth_url: outlook::AUTH_URL.to_string(),
            mailboxes: vec!["Junk".to_string(), "Inbox".to_string()],
        }
    }

    /// Token endpoint settings for the exchanger
    pub fn oauth2(&self) -> OAuth2Config {
        OAuth2Config {
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self::outlook()
    }
}
