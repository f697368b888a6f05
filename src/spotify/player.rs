use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};

use crate::{
    error::SyncError,
    spotify::{PlaybackApi, error_from_response},
    types::{CurrentPlaybackResponse, Device, DevicesResponse, TransferPlaybackRequest, Track},
};

/// Web API client for playback state, tracks and transport commands.
#[derive(Debug, Clone)]
pub struct SpotifyPlayer {
    client: Client,
    api_url: String,
}

impl SpotifyPlayer {
    pub fn new(client: Client, api_url: &str) -> Self {
        SpotifyPlayer {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Builds `{api_url}/tracks/{track_id}`.
    ///
    /// Catalog ids are base62, so anything else is refused before a request
    /// is made. The id is pushed as a single path segment.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotFound`] for an empty or non-alphanumeric id
    /// - [`SyncError::Config`] if the configured API URL cannot carry a path
    pub fn track_url(&self, track_id: &str) -> Result<Url, SyncError> {
        if track_id.is_empty() || !track_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SyncError::NotFound(format!("invalid track id '{}'", track_id)));
        }

        let mut url = Url::parse(&self.api_url)
            .map_err(|e| SyncError::Config(format!("invalid API URL '{}': {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("invalid API URL '{}'", self.api_url)))?
            .pop_if_empty()
            .push("tracks")
            .push(track_id);
        Ok(url)
    }

    /// Sends a command whose success response carries no body we need.
    async fn command(&self, request: RequestBuilder) -> Result<(), SyncError> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl PlaybackApi for SpotifyPlayer {
    async fn current_playback(
        &self,
        token: &str,
    ) -> Result<Option<CurrentPlaybackResponse>, SyncError> {
        let response = self
            .client
            .get(self.url("/me/player"))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let playback = response
                    .json::<CurrentPlaybackResponse>()
                    .await
                    .map_err(|e| SyncError::Transient(format!("malformed playback state: {}", e)))?;
                Ok(Some(playback))
            }
            _ => Err(error_from_response(response).await),
        }
    }

    async fn track(&self, token: &str, track_id: &str) -> Result<Track, SyncError> {
        let response = self
            .client
            .get(self.track_url(track_id)?)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            // Spotify answers malformed ids with 400 rather than 404
            return Err(match error_from_response(response).await {
                SyncError::Api { status: 400, message } => SyncError::NotFound(message),
                other => other,
            });
        }

        response
            .json::<Track>()
            .await
            .map_err(|e| SyncError::NotFound(format!("malformed track {}: {}", track_id, e)))
    }

    async fn play(&self, token: &str) -> Result<(), SyncError> {
        self.command(
            self.client
                .put(self.url("/me/player/play"))
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0),
        )
        .await
    }

    async fn pause(&self, token: &str) -> Result<(), SyncError> {
        self.command(
            self.client
                .put(self.url("/me/player/pause"))
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0),
        )
        .await
    }

    async fn next(&self, token: &str) -> Result<(), SyncError> {
        self.command(
            self.client
                .post(self.url("/me/player/next"))
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0),
        )
        .await
    }

    async fn previous(&self, token: &str) -> Result<(), SyncError> {
        self.command(
            self.client
                .post(self.url("/me/player/previous"))
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0),
        )
        .await
    }

    async fn devices(&self, token: &str) -> Result<Vec<Device>, SyncError> {
        let response = self
            .client
            .get(self.url("/me/player/devices"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let res = response
            .json::<DevicesResponse>()
            .await
            .map_err(|e| SyncError::Transient(format!("malformed device list: {}", e)))?;
        Ok(res.devices)
    }

    async fn transfer_playback(
        &self,
        token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), SyncError> {
        let body = TransferPlaybackRequest {
            device_ids: vec![device_id.to_string()],
            play,
        };

        self.command(
            self.client
                .put(self.url("/me/player"))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }
}
