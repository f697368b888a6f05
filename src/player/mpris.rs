//! Desktop media controls bridge (MPRIS on Linux) via `souvlaki`.
//!
//! Runs on a dedicated thread that owns the platform controls. It mirrors
//! every replacement of the published [`PlayerState`] and forwards bus events
//! as [`TransportCommand`]s.

use std::{thread, time::Duration};

use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition, PlatformConfig,
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
};

use crate::{
    playback::TransportCommand,
    types::{PlaybackStatus, PlayerState},
    warning,
};

const MEDIA_CONTROLS_DISPLAY_NAME: &str = "Spotify MPRIS controller";
const MEDIA_CONTROLS_DBUS_NAME: &str = "spotmpris";

/// Maps a bus event onto a transport command. Stop is treated as pause.
pub fn map_control_event(event: MediaControlEvent) -> Option<TransportCommand> {
    match event {
        MediaControlEvent::Play => Some(TransportCommand::Play),
        MediaControlEvent::Pause | MediaControlEvent::Stop => Some(TransportCommand::Pause),
        MediaControlEvent::Toggle => Some(TransportCommand::PlayPause),
        MediaControlEvent::Next => Some(TransportCommand::Next),
        MediaControlEvent::Previous => Some(TransportCommand::Previous),
        _ => None,
    }
}

/// Starts the bridge thread. Must be called from within a Tokio runtime.
pub fn spawn(
    state: watch::Receiver<PlayerState>,
    commands: mpsc::UnboundedSender<TransportCommand>,
) -> std::io::Result<thread::JoinHandle<()>> {
    let runtime = Handle::current();
    thread::Builder::new()
        .name("media-controls".to_string())
        .spawn(move || run(runtime, state, commands))
}

fn run(
    runtime: Handle,
    mut state: watch::Receiver<PlayerState>,
    commands: mpsc::UnboundedSender<TransportCommand>,
) {
    let mut controls = match MediaControls::new(PlatformConfig {
        display_name: MEDIA_CONTROLS_DISPLAY_NAME,
        dbus_name: MEDIA_CONTROLS_DBUS_NAME,
        hwnd: None,
    }) {
        Ok(controls) => controls,
        Err(err) => {
            warning!("Failed to create media controls backend: {:?}", err);
            return;
        }
    };

    if let Err(err) = controls.attach(move |event| {
        if let Some(command) = map_control_event(event) {
            let _ = commands.send(command);
        }
    }) {
        warning!("Failed to attach media controls handler: {:?}", err);
        return;
    }

    let mut published = state.borrow_and_update().clone();
    publish(&mut controls, &published, None);

    while runtime.block_on(state.changed()).is_ok() {
        let next = state.borrow_and_update().clone();
        publish(&mut controls, &next, Some(&published));
        published = next;
    }
}

fn publish(controls: &mut MediaControls, state: &PlayerState, previous: Option<&PlayerState>) {
    if previous.map(|p| &p.metadata) != Some(&state.metadata) {
        let result = match &state.metadata {
            Some(metadata) => {
                let artist = metadata.artists.join(", ");
                controls.set_metadata(MediaMetadata {
                    title: Some(metadata.title.as_str()),
                    album: Some(metadata.album.as_str()),
                    artist: Some(artist.as_str()),
                    cover_url: metadata.artwork_uri.as_deref(),
                    duration: Some(Duration::from_millis(metadata.duration_ms)),
                })
            }
            None => controls.set_metadata(MediaMetadata::default()),
        };

        if let Err(err) = result {
            warning!("Failed to publish metadata: {:?}", err);
        }
    }

    let progress = Some(MediaPosition(Duration::from_millis(state.position_ms())));
    let playback = match state.status {
        PlaybackStatus::Playing => MediaPlayback::Playing { progress },
        PlaybackStatus::Paused => MediaPlayback::Paused { progress },
        PlaybackStatus::Stopped => MediaPlayback::Stopped,
    };

    if let Err(err) = controls.set_playback(playback) {
        warning!("Failed to publish playback state {:?}: {:?}", state.status, err);
    }
}
