//! # Spotify Integration Module
//!
//! This module is the integration layer between the bridge and the Spotify Web
//! API. It exposes two capability traits that the rest of the crate depends on,
//! and a `reqwest` based implementation of each:
//!
//! ```text
//! Session Manager ──► AuthApi      ──► accounts.spotify.com/api/token
//! Reconciler      ─┐
//! Dispatcher      ─┴► PlaybackApi  ──► api.spotify.com/v1/me/player, /tracks
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - Authorization code grant with a confidential client:
//! - **Authorization URL**: built once for the account owner to visit
//! - **Code Exchange**: trades the callback's one-time code for a token pair
//! - **Refresh**: trades the refresh token for a new access token
//!
//! ### Player Module
//!
//! [`player`] - Playback state and transport commands:
//! - `GET /me/player` - current playback, `204 No Content` when idle
//! - `GET /tracks/{id}` - full track object for notifications
//! - `PUT /me/player/play`, `PUT /me/player/pause`
//! - `POST /me/player/next`, `POST /me/player/previous`
//! - `GET /me/player/devices`, `PUT /me/player` (transfer playback)
//!
//! ## Error Mapping
//!
//! Every non-success response is classified into a [`SyncError`]:
//!
//! | Response                                   | Error                  |
//! |--------------------------------------------|------------------------|
//! | transport failure, 429, 5xx                | `Transient`            |
//! | 401                                        | `Unauthorized`         |
//! | 404 with reason `NO_ACTIVE_DEVICE`         | `DeviceRequired`       |
//! | other 404                                  | `NotFound`             |
//! | any other status                           | `Api`                  |
//!
//! Token endpoint failures with 400/401 are rejections of the presented grant
//! (`AuthExchange` for codes, `Refresh` for refresh tokens).
//!
//! ## Thread Safety
//!
//! Both clients hold a shared `reqwest::Client` and no mutable state; they are
//! used behind `Arc<dyn ...>` from any task.

use async_trait::async_trait;

use crate::{
    error::SyncError,
    types::{ApiErrorResponse, CurrentPlaybackResponse, Device, TokenErrorResponse, TokenResponse, Track},
};

pub mod auth;
pub mod player;

pub use auth::SpotifyAuth;
pub use player::SpotifyPlayer;

/// Token endpoint capability used by the session manager.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// URL the account owner visits once to grant access.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SyncError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SyncError>;
}

/// Playback capability used by the reconciler and the command dispatcher.
///
/// Every call takes the bearer token explicitly; callers obtain it from the
/// session manager right before the call.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    /// `Ok(None)` when the account has no playback session at all.
    async fn current_playback(
        &self,
        token: &str,
    ) -> Result<Option<CurrentPlaybackResponse>, SyncError>;

    async fn track(&self, token: &str, track_id: &str) -> Result<Track, SyncError>;

    async fn play(&self, token: &str) -> Result<(), SyncError>;

    async fn pause(&self, token: &str) -> Result<(), SyncError>;

    async fn next(&self, token: &str) -> Result<(), SyncError>;

    async fn previous(&self, token: &str) -> Result<(), SyncError>;

    async fn devices(&self, token: &str) -> Result<Vec<Device>, SyncError>;

    async fn transfer_playback(
        &self,
        token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), SyncError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

/// Classifies a failed Web API response.
pub fn classify_api_error(status: u16, body: &str) -> SyncError {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let reason = parsed.and_then(|e| e.error.reason);

    match status {
        401 => SyncError::Unauthorized,
        429 | 500..=599 => SyncError::Transient(format!("HTTP {}: {}", status, message)),
        404 if reason.as_deref() == Some("NO_ACTIVE_DEVICE")
            || message.to_lowercase().contains("no active device") =>
        {
            SyncError::DeviceRequired(message)
        }
        404 => SyncError::NotFound(message),
        _ => SyncError::Api { status, message },
    }
}

/// Classifies a failed token endpoint response.
pub fn classify_token_error(status: u16, body: &str, kind: GrantKind) -> SyncError {
    let message = serde_json::from_str::<TokenErrorResponse>(body)
        .map(|e| match e.error_description {
            Some(desc) => format!("{}: {}", e.error, desc),
            None => e.error,
        })
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body.trim()));

    match (status, kind) {
        (400 | 401, GrantKind::AuthorizationCode) => SyncError::AuthExchange(message),
        (400 | 401, GrantKind::RefreshToken) => SyncError::Refresh(message),
        _ => SyncError::Transient(message),
    }
}

pub(crate) async fn error_from_response(response: reqwest::Response) -> SyncError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    classify_api_error(status, &body)
}
