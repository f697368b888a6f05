use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    error::SyncError,
    management::SessionManager,
    playback::Reconciler,
    spotify::PlaybackApi,
    types::{Device, DeviceRef, PlaybackStatus},
    utils, warning,
};

/// Transport commands issued from the desktop media bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
}

/// Picks the device to hand playback to when none is active.
///
/// The last device seen active wins if it is still listed, then a device named
/// like this machine. Devices without an id cannot be targeted and are skipped.
///
/// # Arguments
///
/// * `devices` - The account's devices as listed by the Web API
/// * `last_known` - Id of the device last reported active, if any
/// * `hostname` - This machine's hostname, compared case-insensitively
///
/// # Returns
///
/// The selected device, or `None` when neither rule matches.
///
/// # Example
///
/// ```rust,ignore
/// let target = select_device(&devices, Some("a1b2"), Some("workstation"));
/// ```
pub fn select_device(
    devices: &[Device],
    last_known: Option<&str>,
    hostname: Option<&str>,
) -> Option<DeviceRef> {
    let candidates = || {
        devices
            .iter()
            .filter_map(|d| d.id.as_deref().map(|id| (id, d.name.as_str())))
    };

    let by_last_known = last_known.and_then(|wanted| candidates().find(|(id, _)| *id == wanted));
    let by_hostname = || {
        hostname.and_then(|host| candidates().find(|(_, name)| name.eq_ignore_ascii_case(host)))
    };

    by_last_known.or_else(by_hostname).map(|(id, name)| DeviceRef {
        id: id.to_string(),
        name: name.to_string(),
    })
}

/// Turns transport commands into Web API calls.
pub struct CommandDispatcher {
    session: SessionManager,
    api: Arc<dyn PlaybackApi>,
    reconciler: Arc<Reconciler>,
    hostname: Option<String>,
}

impl CommandDispatcher {
    pub fn new(
        session: SessionManager,
        api: Arc<dyn PlaybackApi>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self::with_hostname(session, api, reconciler, utils::local_hostname())
    }

    /// Creates a dispatcher that matches devices against `hostname` instead
    /// of this machine's name.
    pub fn with_hostname(
        session: SessionManager,
        api: Arc<dyn PlaybackApi>,
        reconciler: Arc<Reconciler>,
        hostname: Option<String>,
    ) -> Self {
        CommandDispatcher {
            session,
            api,
            reconciler,
            hostname,
        }
    }

    /// Runs a command, logging any failure. Never fails the caller.
    pub async fn dispatch(&self, command: TransportCommand) {
        let result = match command {
            TransportCommand::Play => self.play().await,
            TransportCommand::Pause => self.pause().await,
            TransportCommand::PlayPause => self.toggle_play_pause().await,
            TransportCommand::Next => {
                self.next().await;
                Ok(())
            }
            TransportCommand::Previous => {
                self.previous().await;
                Ok(())
            }
        };

        if let Err(e) = result {
            warning!("Failed to {:?}: {}", command, e);
        }
    }

    /// Handles every command on its own task so a slow call never delays the next.
    pub fn spawn_command_loop(
        self: Arc<Self>,
        mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let dispatcher = Arc::clone(&self);
                tokio::spawn(async move { dispatcher.dispatch(command).await });
            }
        })
    }

    /// Pauses playback and publishes `Paused`.
    ///
    /// # Errors
    ///
    /// Returns the Web API failure unchanged; the published status is left as
    /// it was.
    pub async fn pause(&self) -> Result<(), SyncError> {
        let token = self.token().await?;
        self.api
            .pause(&token)
            .await
            .inspect_err(|e| self.reconciler.note_failure(e))?;
        self.reconciler.publish_status(PlaybackStatus::Paused);
        Ok(())
    }

    /// Resumes playback, handing it to a selected device when none is active.
    ///
    /// Only a "no active device" refusal triggers the device fallback; any
    /// other failure is returned unchanged.
    ///
    /// # Fallback
    ///
    /// 1. List the account's devices
    /// 2. Pick one with [`select_device`]
    /// 3. Transfer playback to it with autoplay
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoDevice`] if no listed device qualifies; nothing is transferred
    /// - Any error from the play, device listing or transfer call
    pub async fn play(&self) -> Result<(), SyncError> {
        let token = self.token().await?;
        match self.api.play(&token).await {
            Ok(()) => {}
            Err(SyncError::DeviceRequired(_)) => {
                let devices = self
                    .api
                    .devices(&token)
                    .await
                    .inspect_err(|e| self.reconciler.note_failure(e))?;
                let target = select_device(
                    &devices,
                    self.reconciler.last_known_device().as_deref(),
                    self.hostname.as_deref(),
                )
                .ok_or(SyncError::NoDevice)?;

                self.api
                    .transfer_playback(&token, &target.id, true)
                    .await
                    .inspect_err(|e| self.reconciler.note_failure(e))?;
            }
            Err(e) => {
                self.reconciler.note_failure(&e);
                return Err(e);
            }
        }

        self.reconciler.publish_status(PlaybackStatus::Playing);
        Ok(())
    }

    /// Pauses if the account is playing right now, otherwise plays.
    ///
    /// Acts on the remote state fetched right now, not on the published one.
    /// The fetch also refreshes the last known device.
    pub async fn toggle_play_pause(&self) -> Result<(), SyncError> {
        let token = self.token().await?;
        let playback = self
            .api
            .current_playback(&token)
            .await
            .inspect_err(|e| self.reconciler.note_failure(e))?;

        if let Some(playback) = &playback {
            self.reconciler.observe_device(playback);
        }

        match playback {
            Some(playback) if playback.is_playing => self.pause().await,
            _ => self.play().await,
        }
    }

    /// Skips to the next track. Failures are logged, never returned.
    pub async fn next(&self) {
        self.skip(TransportCommand::Next).await;
    }

    /// Skips to the previous track. Failures are logged, never returned.
    pub async fn previous(&self) {
        self.skip(TransportCommand::Previous).await;
    }

    async fn skip(&self, command: TransportCommand) {
        let token = match self.token().await {
            Ok(token) => token,
            Err(e) => {
                warning!("Failed to {:?}: {}", command, e);
                return;
            }
        };

        let result = match command {
            TransportCommand::Previous => self.api.previous(&token).await,
            _ => self.api.next(&token).await,
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.reconciler.reconcile_from_poll().await {
                    warning!("Failed to refresh playback after {:?}: {}", command, e);
                }
            }
            Err(e) => {
                self.reconciler.note_failure(&e);
                warning!("Failed to {:?}: {}", command, e);
            }
        }
    }

    async fn token(&self) -> Result<String, SyncError> {
        Ok(self.session.ensure_fresh().await?.access_token)
    }
}
