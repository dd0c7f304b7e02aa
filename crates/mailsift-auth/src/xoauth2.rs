//! XOAUTH2 SASL mechanism for IMAP
//!
//! Implements the XOAUTH2 authentication mechanism as specified at:
//! https://developers.google.com/workspace/gmail/imap/xoauth2-protocol

use oauth2::AccessToken;

/// XOAUTH2 credentials for one login
#[derive(Debug, Clone)]
pub struct XOAuth2Token {
    /// Email address
    email: String,
    /// OAuth2 access token (redacted in `Debug`)
    access_token: AccessToken,
}

impl XOAuth2Token {
    /// Create a new XOAUTH2 token
    pub fn new(email: &str, access_token: &AccessToken) -> Self {
        Self {
            email: email.to_string(),
            access_token: access_token.clone(),
        }
    }

    /// Get the email address
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Generate the XOAUTH2 authentication string
    ///
    /// Format: "user={email}\x01auth=Bearer {token}\x01\x01"
    pub fn auth_string(&self) -> String {
        format!(
            "user={}\x01auth=Bearer {}\x01\x01",
            self.email,
            self.access_token.secret()
        )
    }
}
