//! OAuth2 refresh-token exchange
//!
//! Turns a long-lived refresh token into a short-lived access token. The
//! request is a single refresh-token grant against the provider's token
//! endpoint; retrying is left to the caller.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AccessToken, AuthUrl, ClientId, HttpRequest, HttpResponse, RefreshToken,
    TokenResponse, TokenUrl,
};
use std::future::Future;
use tracing::{debug, info};

/// Exchanges a refresh token for an access token
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, client_id: &str, refresh_token: &str) -> AuthResult<AccessToken>;
}

/// Token endpoint configuration
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Authorization endpoint URL (required by the client, unused by the refresh grant)
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            auth_url: crate::outlook::AUTH_URL.to_string(),
            token_url: crate::outlook::TOKEN_URL.to_string(),
        }
    }
}

/// [`TokenExchanger`] backed by the `oauth2` crate's refresh-token grant
#[derive(Debug, Clone)]
pub struct OAuth2TokenExchanger {
    auth_url: AuthUrl,
    token_url: TokenUrl,
}

impl OAuth2TokenExchanger {
    /// Create an exchanger for the given endpoints
    pub fn new(config: &OAuth2Config) -> AuthResult<Self> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid token URL: {}", e)))?;

        Ok(Self {
            auth_url,
            token_url,
        })
    }

    /// Refresh using a caller-supplied HTTP client
    ///
    /// The request carries `client_id`, `grant_type=refresh_token` and
    /// `refresh_token` as form fields; no client secret is sent.
    pub async fn refresh_with<C, F, RE>(
        &self,
        client_id: &str,
        refresh_token: &str,
        http_client: C,
    ) -> AuthResult<AccessToken>
    where
        C: FnOnce(HttpRequest) -> F,
        F: Future<Output = Result<HttpResponse, RE>>,
        RE: std::error::Error + Send + Sync + 'static,
    {
        if client_id.is_empty() {
            return Err(AuthError::InvalidInput("client id"));
        }
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput("refresh token"));
        }

        let client = BasicClient::new(
            ClientId::new(client_id.to_string()),
            None,
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        );

        debug!("Requesting access token from {}", self.token_url.as_str());

        let token_response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(Box::new(e)))?;

        if let Some(expires_in) = token_response.expires_in() {
            debug!("Access token valid for {}s", expires_in.as_secs());
        }

        Ok(token_response.access_token().clone())
    }
}

#[async_trait]
impl TokenExchanger for OAuth2TokenExchanger {
    async fn exchange(&self, client_id: &str, refresh_token: &str) -> AuthResult<AccessToken> {
        let token = self
            .refresh_with(client_id, refresh_token, oauth2::reqwest::async_http_client)
            .await?;
        info!("Obtained access token");
        Ok(token)
    }
}
