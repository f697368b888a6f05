use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{
    config::{Config, SPOTIFY_SCOPES},
    error::SyncError,
    spotify::{AuthApi, GrantKind, classify_token_error},
    types::TokenResponse,
};

/// Token endpoint client for a confidential Spotify application.
///
/// Both grants authenticate the application with HTTP Basic credentials
/// (`client_id:client_secret`), as Spotify requires for the authorization
/// code flow without PKCE.
#[derive(Debug, Clone)]
pub struct SpotifyAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
}

impl SpotifyAuth {
    /// Creates the client from a configuration whose secret is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if no client secret is available.
    pub fn new(client: Client, config: &Config) -> Result<Self, SyncError> {
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            SyncError::Config("client secret has not been resolved".to_string())
        })?;

        Ok(SpotifyAuth {
            client,
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
        })
    }

    /// Posts a grant to the token endpoint.
    ///
    /// # Token Response
    ///
    /// A refresh grant may omit `refresh_token`; the caller keeps the one it
    /// already has in that case.
    async fn grant(&self, form: &[(&str, &str)], kind: GrantKind) -> Result<TokenResponse, SyncError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_token_error(status.as_u16(), &body, kind));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SyncError::Transient(format!("malformed token response: {}", e)))
    }
}

#[async_trait]
impl AuthApi for SpotifyAuth {
    fn authorize_url(&self, state: &str) -> String {
        let scope = SPOTIFY_SCOPES.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ];

        match Url::parse_with_params(&self.auth_url, &params) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
                self.auth_url, self.client_id, self.redirect_uri, scope, state
            ),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SyncError> {
        self.grant(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ],
            GrantKind::AuthorizationCode,
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SyncError> {
        self.grant(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            GrantKind::RefreshToken,
        )
        .await
    }
}
