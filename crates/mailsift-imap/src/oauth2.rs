//! XOAUTH2 authenticator for async-imap

use mailsift_auth::XOAuth2Token;
use tracing::debug;

/// XOAUTH2 authenticator for async-imap
///
/// async-imap base64-encodes whatever `process` returns, so the raw auth
/// string is handed over here.
#[derive(Debug, Clone)]
pub struct XOAuth2Authenticator {
    token: XOAuth2Token,
    /// Set once the credentials have been sent
    sent: bool,
}

impl XOAuth2Authenticator {
    /// Create a new XOAUTH2 authenticator
    pub fn new(token: XOAuth2Token) -> Self {
        Self { token, sent: false }
    }
}

impl async_imap::Authenticator for XOAuth2Authenticator {
    type Response = String;

    fn process(&mut self, challenge: &[u8]) -> Self::Response {
        if self.sent {
            // A second challenge carries the server's JSON error; an empty
            // response makes the server finish with a tagged NO.
            debug!(
                "XOAUTH2 error challenge: {}",
                String::from_utf8_lossy(challenge)
            );
            return String::new();
        }
        self.sent = true;
        self.token.auth_string()
    }
}
