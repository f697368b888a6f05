use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::{
    error::SyncError,
    management::{ArtworkResolver, SessionManager},
    player::PublishedPlayer,
    spotify::PlaybackApi,
    types::{
        CurrentPlaybackResponse, PlaybackSnapshot, PlaybackStatus, PlayerState, Track,
        TrackMetadata,
    },
    warning,
};

/// Event kinds accepted from track notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Start,
    Change,
    Playing,
    Paused,
    Stop,
}

impl TrackEvent {
    /// Unknown kinds yield `None`; sources do not have a closed vocabulary.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "start" => Some(TrackEvent::Start),
            "change" => Some(TrackEvent::Change),
            "playing" => Some(TrackEvent::Playing),
            "paused" | "pause" => Some(TrackEvent::Paused),
            "stop" => Some(TrackEvent::Stop),
            _ => None,
        }
    }

    pub fn status(self) -> PlaybackStatus {
        match self {
            TrackEvent::Start | TrackEvent::Change | TrackEvent::Playing => PlaybackStatus::Playing,
            TrackEvent::Paused | TrackEvent::Stop => PlaybackStatus::Paused,
        }
    }
}

/// Metadata for a track, without artwork.
pub fn metadata_from_track(track: &Track) -> TrackMetadata {
    TrackMetadata {
        id: track.key().to_string(),
        title: track.name.clone(),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        album: track.album.name.clone(),
        album_artists: track.album.artists.iter().map(|a| a.name.clone()).collect(),
        track_number: track.track_number,
        duration_ms: track.duration_ms,
        artwork_uri: None,
        preview_url: track.preview_url.clone(),
    }
}

/// Keeps the published player state consistent with the remote account.
///
/// Two triggers write the state: the periodic poll and pushed track
/// notifications. Each computes a complete [`PlayerState`] and publishes it in
/// one replacement; concurrent writers race and the last to finish wins. The
/// next poll corrects whatever a stale writer left behind.
pub struct Reconciler {
    session: SessionManager,
    api: Arc<dyn PlaybackApi>,
    artwork: Arc<dyn ArtworkResolver>,
    player: PublishedPlayer,
    last_known_device: Mutex<Option<String>>,
}

impl Reconciler {
    pub fn new(
        session: SessionManager,
        api: Arc<dyn PlaybackApi>,
        artwork: Arc<dyn ArtworkResolver>,
        player: PublishedPlayer,
    ) -> Self {
        Reconciler {
            session,
            api,
            artwork,
            player,
            last_known_device: Mutex::new(None),
        }
    }

    pub fn player(&self) -> &PublishedPlayer {
        &self.player
    }

    /// Id of the device most recently seen active, if any.
    pub fn last_known_device(&self) -> Option<String> {
        match self.last_known_device.lock() {
            Ok(device) => device.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records the active device of a freshly fetched playback state.
    pub fn observe_device(&self, playback: &CurrentPlaybackResponse) {
        let Some(device_id) = playback
            .device
            .as_ref()
            .filter(|d| d.is_active)
            .and_then(|d| d.id.clone())
        else {
            return;
        };

        match self.last_known_device.lock() {
            Ok(mut device) => *device = Some(device_id),
            Err(poisoned) => *poisoned.into_inner() = Some(device_id),
        }
    }

    /// Fetches the remote playback state and republishes it.
    ///
    /// On failure the published state is left untouched. A `204` answer (no
    /// playback session on the account) publishes `Stopped`.
    pub async fn reconcile_from_poll(&self) -> Result<(), SyncError> {
        let credential = self.session.ensure_fresh().await?;
        let playback = self
            .api
            .current_playback(&credential.access_token)
            .await
            .inspect_err(|e| self.note_failure(e))?;

        let Some(playback) = playback else {
            self.player.publish(PlayerState::default());
            return Ok(());
        };

        self.observe_device(&playback);

        let snapshot = PlaybackSnapshot {
            is_playing: playback.is_playing,
            track_id: playback.item.as_ref().map(|t| t.key().to_string()),
            device_id: playback.device.as_ref().and_then(|d| d.id.clone()),
            position_ms: playback.progress_ms.unwrap_or(0),
        };

        let published = self.player.current();
        let metadata = match &playback.item {
            Some(track) if published.track_id() == Some(track.key()) => published.metadata,
            Some(track) => Some(self.derive_metadata(track).await),
            None => None,
        };

        self.player.publish(PlayerState {
            status: PlaybackStatus::from_is_playing(playback.is_playing),
            snapshot: Some(snapshot),
            metadata,
        });
        Ok(())
    }

    /// Applies a pushed "track started/paused" notification.
    ///
    /// The track is always fetched by id: the notification can arrive before
    /// the next poll would see the change. Unrecognised event kinds update the
    /// metadata and keep the current status.
    pub async fn reconcile_from_notification(
        &self,
        track_id: &str,
        event: &str,
    ) -> Result<PlaybackStatus, SyncError> {
        let credential = self.session.ensure_fresh().await?;
        let track = self
            .api
            .track(&credential.access_token, track_id)
            .await
            .inspect_err(|e| self.note_failure(e))?;
        let metadata = self.derive_metadata(&track).await;

        let status = match TrackEvent::parse(event) {
            Some(event) => event.status(),
            None => self.player.current().status,
        };

        self.player.publish(PlayerState {
            status,
            snapshot: Some(PlaybackSnapshot {
                is_playing: status == PlaybackStatus::Playing,
                track_id: Some(track.key().to_string()),
                device_id: None,
                position_ms: 0,
            }),
            metadata: Some(metadata),
        });
        Ok(status)
    }

    /// Republishes the current state with a new status after a command succeeded.
    pub fn publish_status(&self, status: PlaybackStatus) {
        self.player.update_status(status);
    }

    /// Polls on a fixed cadence. Failures are logged and never end the loop.
    pub fn spawn_polling(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match self.reconcile_from_poll().await {
                    Ok(()) | Err(SyncError::Unauthenticated) => {}
                    Err(e) => warning!("Failed to poll playback state: {}", e),
                }
            }
        })
    }

    pub(crate) fn note_failure(&self, err: &SyncError) {
        if matches!(err, SyncError::Unauthorized) {
            self.session.invalidate_access_token();
        }
    }

    async fn derive_metadata(&self, track: &Track) -> TrackMetadata {
        let mut metadata = metadata_from_track(track);
        if let Some(image) = track.album.images.first() {
            match self.artwork.resolve(&image.url).await {
                Ok(uri) => metadata.artwork_uri = Some(uri),
                Err(e) => warning!("Failed to cache artwork for {}: {}", track.key(), e),
            }
        }
        metadata
    }
}
