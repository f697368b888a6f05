//! Configuration management for the Spotify MPRIS bridge.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. The configuration system follows a hierarchical
//! approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)
//!
//! The client secret may be omitted from both; it is then looked up in the OS
//! keyring under the service `spotmpris` with the client id as account.

use std::{env, path::PathBuf, time::Duration};

use crate::{error::SyncError, management::store::lookup_client_secret};

pub const APP_NAME: &str = "spotmpris";

const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_PORT: u16 = 8888;
const DEFAULT_POLL_SECONDS: u64 = 25;

/// Scopes needed to read and control playback.
pub const SPOTIFY_SCOPES: &[&str] = &[
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    Keyring,
    File,
}

/// Everything the daemon needs to talk to Spotify and to listen locally.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    /// `None` until resolved from the keyring by [`Config::resolve_client_secret`].
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub port: u16,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub poll_interval: Duration,
    pub token_store: TokenStoreKind,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if a required key is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Keeping the parsing independent of `std::env` lets it be exercised
    /// without touching the process environment.
    ///
    /// # Keys
    ///
    /// - `SPOTIFY_API_AUTH_CLIENT_ID` (required)
    /// - `SPOTIFY_API_AUTH_CLIENT_SECRET` (optional)
    /// - `SPOTIFY_API_REDIRECT_URI` (required)
    /// - `SERVER_PORT` (default 8888)
    /// - `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_TOKEN_URL`, `SPOTIFY_API_URL`
    /// - `SPOTMPRIS_POLL_SECONDS` (default 25)
    /// - `SPOTMPRIS_TOKEN_STORE` (`keyring` or `file`, default `keyring`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| SyncError::Config(format!("{} must be set", key)))
        };

        let port = match get("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| SyncError::Config(format!("invalid SERVER_PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let poll_seconds = match get("SPOTMPRIS_POLL_SECONDS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                SyncError::Config(format!("invalid SPOTMPRIS_POLL_SECONDS '{}'", raw))
            })?,
            None => DEFAULT_POLL_SECONDS,
        };

        let token_store = match get("SPOTMPRIS_TOKEN_STORE").as_deref() {
            None | Some("keyring") => TokenStoreKind::Keyring,
            Some("file") => TokenStoreKind::File,
            Some(other) => {
                return Err(SyncError::Config(format!(
                    "unknown SPOTMPRIS_TOKEN_STORE '{}', expected 'keyring' or 'file'",
                    other
                )));
            }
        };

        Ok(Config {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            client_secret: get("SPOTIFY_API_AUTH_CLIENT_SECRET"),
            redirect_uri: required("SPOTIFY_API_REDIRECT_URI")?,
            port,
            auth_url: get("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: get("SPOTIFY_API_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_url: get("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            poll_interval: Duration::from_secs(poll_seconds),
            token_store,
        })
    }

    /// Fills in the client secret from the OS keyring when the environment
    /// did not provide one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] with the `secret-tool` command to run when
    /// no secret is stored, or [`SyncError::Store`] if the keyring fails.
    pub async fn resolve_client_secret(&mut self) -> Result<&str, SyncError> {
        if self.client_secret.is_none() {
            let client_id = self.client_id.clone();
            let stored = tokio::task::spawn_blocking(move || lookup_client_secret(&client_id))
                .await
                .map_err(|e| SyncError::Store(e.to_string()))??;
            let secret = stored.ok_or_else(|| {
                SyncError::Config(format!(
                    "Please store the client secret using secret-tool: secret-tool store --label='{app}/{id}' service {app} username {id}",
                    app = APP_NAME,
                    id = self.client_id
                ))
            })?;
            self.client_secret = Some(secret);
        }

        Ok(self.client_secret.as_deref().unwrap_or_default())
    }
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the directory if it doesn't exist. A missing `.env` file is not an
/// error: every key can also come from the real environment.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/spotmpris/.env`
/// - macOS: `~/Library/Application Support/spotmpris/.env`
/// - Windows: `%LOCALAPPDATA%/spotmpris/.env`
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Returns the application's local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_NAME);
    path
}
