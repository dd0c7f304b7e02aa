//! Authentication module for mailsift
//!
//! Exchanges an OAuth2 refresh token for a short-lived access token and
//! builds the XOAUTH2 credentials used to log in to the IMAP server.

mod error;
mod exchange;
mod xoauth2;

pub use ::oauth2::AccessToken;
pub use error::{AuthError, AuthResult};
pub use exchange::{OAuth2Config, OAuth2TokenExchanger, TokenExchanger};
pub use xoauth2::XOAuth2Token;

/// Outlook / Microsoft consumer account endpoints
pub mod outlook {
    /// Authorization endpoint
    pub const AUTH_URL: &str = "https://login.live.com/oauth20_authorize.srf";

    /// Token endpoint used for the refresh-token grant
    pub const TOKEN_URL: &str = "https://login.live.com/oauth20_token.srf";

    /// Outlook IMAP server
    pub const IMAP_HOST: &str = "outlook.office365.com";
    pub const IMAP_PORT: u16 = 993;
}
