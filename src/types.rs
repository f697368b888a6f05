use serde::{Deserialize, Serialize};

/// Access/refresh token pair with its advisory expiry.
///
/// `expires_at` is derived from the moment of the last successful grant plus
/// the lifetime the server reported. The remote service stays the authority on
/// actual validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl Credential {
    /// A credential known only by its persisted refresh token. It is always
    /// considered expired so the first `ensure_fresh` performs a refresh.
    pub fn from_refresh_token(refresh_token: String) -> Self {
        Credential {
            access_token: String::new(),
            refresh_token,
            expires_at: 0,
        }
    }

    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}

/// The record persisted across restarts. The access token is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredentials {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    pub fn from_is_playing(is_playing: bool) -> Self {
        if is_playing {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub track_id: Option<String>,
    pub device_id: Option<String>,
    pub position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_artists: Vec<String>,
    pub track_number: u32,
    pub duration_ms: u64,
    pub artwork_uri: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub id: String,
    pub name: String,
}

/// The externally visible player state. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub status: PlaybackStatus,
    pub snapshot: Option<PlaybackSnapshot>,
    pub metadata: Option<TrackMetadata>,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            status: PlaybackStatus::Stopped,
            snapshot: None,
            metadata: None,
        }
    }
}

impl PlayerState {
    /// Position is never tracked locally; the remote service owns it.
    pub fn position_ms(&self) -> u64 {
        0
    }

    pub fn track_id(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPlaybackResponse {
    #[serde(default)]
    pub device: Option<Device>,
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPlaybackRequest {
    pub device_ids: Vec<String>,
    pub play: bool,
}

/// A track object from the Web API.
///
/// Local files (`is_local`) come without a catalog `id`; their `uri` is the
/// only stable identity they have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub is_local: bool,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub album: Album,
    #[serde(default)]
    pub track_number: u32,
    pub duration_ms: u64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Track {
    /// Identity used to tell tracks apart: the catalog id, else the URI.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.uri)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}
