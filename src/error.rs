use thiserror::Error;

/// Errors raised by the session, reconciliation and command components.
///
/// Payloads are plain strings so the type stays `Clone`: a single token
/// exchange result is handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The authorization code was rejected (expired, reused or malformed).
    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(String),

    /// The refresh token was rejected; the session needs re-authorization.
    #[error("Refresh token rejected: {0}")]
    Refresh(String),

    /// Network failure, rate limiting or a server error. Retried next cycle.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// No playback device could be selected for the play fallback.
    #[error("No eligible playback device")]
    NoDevice,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A player command was refused because no device is currently active.
    #[error("No active device: {0}")]
    DeviceRequired(String),

    /// The access token was refused by the Web API.
    #[error("Access token rejected (HTTP 401)")]
    Unauthorized,

    #[error("Not authenticated yet")]
    Unauthenticated,

    #[error("Spotify API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether the failure should simply be retried on the next scheduled cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient(_) | SyncError::Unauthorized)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transient(err.to_string())
    }
}
