#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use spotmpris::{
    SyncError,
    management::{ArtworkResolver, CredentialStore, SessionManager},
    playback::{CommandDispatcher, Reconciler},
    player::PublishedPlayer,
    spotify::{AuthApi, PlaybackApi},
    types::{
        Album, CachedCredentials, CurrentPlaybackResponse, Device, Image, SimpleArtist,
        TokenResponse, Track,
    },
};

pub fn grant(access: &str, refresh: Option<&str>, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: access.to_string(),
        token_type: Some("Bearer".to_string()),
        scope: None,
        expires_in,
        refresh_token: refresh.map(str::to_string),
    }
}

pub struct FakeAuth {
    pub code_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub code_result: Mutex<Result<TokenResponse, SyncError>>,
    pub refresh_result: Mutex<Result<TokenResponse, SyncError>>,
    pub refresh_delay: Mutex<Duration>,
}

impl FakeAuth {
    pub fn new() -> Self {
        FakeAuth {
            code_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            code_result: Mutex::new(Ok(grant("access-code", Some("refresh-code"), 3600))),
            refresh_result: Mutex::new(Ok(grant("access-refreshed", None, 3600))),
            refresh_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_code_result(&self, result: Result<TokenResponse, SyncError>) {
        *self.code_result.lock().unwrap() = result;
    }

    pub fn set_refresh_result(&self, result: Result<TokenResponse, SyncError>) {
        *self.refresh_result.lock().unwrap() = result;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn codes(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.test/authorize?client_id=test-client&state={}", state)
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenResponse, SyncError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        self.code_result.lock().unwrap().clone()
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, SyncError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.refresh_result.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub cached: Mutex<Option<CachedCredentials>>,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with_token(refresh_token: &str) -> Self {
        MemoryStore {
            cached: Mutex::new(Some(CachedCredentials {
                refresh_token: refresh_token.to_string(),
            })),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.cached
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.refresh_token.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<CachedCredentials>, SyncError> {
        Ok(self.cached.lock().unwrap().clone())
    }

    async fn save(&self, credentials: &CachedCredentials) -> Result<(), SyncError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.cached.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SyncError> {
        *self.cached.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeArtwork {
    pub calls: AtomicUsize,
    pub fail: Mutex<bool>,
}

impl FakeArtwork {
    pub fn resolves(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtworkResolver for FakeArtwork {
    async fn resolve(&self, image_url: &str) -> Result<String, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(SyncError::Transient("image host unreachable".to_string()));
        }
        let key = image_url.rsplit('/').next().unwrap_or_default();
        Ok(format!("file:///tmp/spotmpris/spotify-{}.jpeg", key))
    }
}

pub struct FakePlayback {
    pub playback: Mutex<Result<Option<CurrentPlaybackResponse>, SyncError>>,
    pub tracks: Mutex<HashMap<String, Track>>,
    pub play_result: Mutex<Result<(), SyncError>>,
    pub pause_result: Mutex<Result<(), SyncError>>,
    pub skip_result: Mutex<Result<(), SyncError>>,
    pub devices: Mutex<Vec<Device>>,
    pub devices_error: Mutex<Option<SyncError>>,
    pub transfer_result: Mutex<Result<(), SyncError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePlayback {
    pub fn new() -> Self {
        FakePlayback {
            playback: Mutex::new(Ok(None)),
            tracks: Mutex::new(HashMap::new()),
            play_result: Mutex::new(Ok(())),
            pause_result: Mutex::new(Ok(())),
            skip_result: Mutex::new(Ok(())),
            devices: Mutex::new(Vec::new()),
            devices_error: Mutex::new(None),
            transfer_result: Mutex::new(Ok(())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_playback(&self, playback: Result<Option<CurrentPlaybackResponse>, SyncError>) {
        *self.playback.lock().unwrap() = playback;
    }

    pub fn add_track(&self, track: Track) {
        self.tracks.lock().unwrap().insert(track.key().to_string(), track);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(name))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackApi for FakePlayback {
    async fn current_playback(
        &self,
        _token: &str,
    ) -> Result<Option<CurrentPlaybackResponse>, SyncError> {
        self.record("current_playback".to_string());
        self.playback.lock().unwrap().clone()
    }

    async fn track(&self, _token: &str, track_id: &str) -> Result<Track, SyncError> {
        self.record(format!("track:{}", track_id));
        self.tracks
            .lock()
            .unwrap()
            .get(track_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("non existing id: {}", track_id)))
    }

    async fn play(&self, _token: &str) -> Result<(), SyncError> {
        self.record("play".to_string());
        self.play_result.lock().unwrap().clone()
    }

    async fn pause(&self, _token: &str) -> Result<(), SyncError> {
        self.record("pause".to_string());
        self.pause_result.lock().unwrap().clone()
    }

    async fn next(&self, _token: &str) -> Result<(), SyncError> {
        self.record("next".to_string());
        self.skip_result.lock().unwrap().clone()
    }

    async fn previous(&self, _token: &str) -> Result<(), SyncError> {
        self.record("previous".to_string());
        self.skip_result.lock().unwrap().clone()
    }

    async fn devices(&self, _token: &str) -> Result<Vec<Device>, SyncError> {
        self.record("devices".to_string());
        if let Some(err) = self.devices_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn transfer_playback(
        &self,
        _token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), SyncError> {
        self.record(format!("transfer:{}:{}", device_id, play));
        self.transfer_result.lock().unwrap().clone()
    }
}

pub fn artist(name: &str) -> SimpleArtist {
    SimpleArtist {
        id: None,
        name: name.to_string(),
    }
}

pub fn track(id: &str, title: &str) -> Track {
    Track {
        id: Some(id.to_string()),
        uri: format!("spotify:track:{}", id),
        is_local: false,
        name: title.to_string(),
        artists: vec![artist("Massive Attack"), artist("Elizabeth Fraser")],
        album: Album {
            name: "Mezzanine".to_string(),
            artists: vec![artist("Massive Attack")],
            images: vec![Image {
                url: format!("https://i.scdn.co/image/cover{}", id),
                width: Some(640),
                height: Some(640),
            }],
        },
        track_number: 3,
        duration_ms: 330_000,
        preview_url: Some(format!("https://p.scdn.co/mp3-preview/{}", id)),
    }
}

pub fn device(id: &str, name: &str, is_active: bool) -> Device {
    Device {
        id: Some(id.to_string()),
        is_active,
        name: name.to_string(),
        device_type: Some("Computer".to_string()),
    }
}

pub fn playing(track: Track, is_playing: bool, device: Option<Device>) -> CurrentPlaybackResponse {
    CurrentPlaybackResponse {
        device,
        is_playing,
        progress_ms: Some(42_000),
        item: Some(track),
    }
}

/// A fully wired set of components over fakes.
pub struct Harness {
    pub auth: Arc<FakeAuth>,
    pub store: Arc<MemoryStore>,
    pub api: Arc<FakePlayback>,
    pub artwork: Arc<FakeArtwork>,
    pub session: SessionManager,
    pub player: PublishedPlayer,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::default()))
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        let auth = Arc::new(FakeAuth::new());
        let api = Arc::new(FakePlayback::new());
        let artwork = Arc::new(FakeArtwork::default());
        let session = SessionManager::new(auth.clone(), store.clone());
        let player = PublishedPlayer::new();
        let reconciler = Arc::new(Reconciler::new(
            session.clone(),
            api.clone(),
            artwork.clone(),
            player.clone(),
        ));

        Harness {
            auth,
            store,
            api,
            artwork,
            session,
            player,
            reconciler,
        }
    }

    /// Harness with a completed authorization.
    pub async fn authorized() -> Self {
        let harness = Self::new();
        harness
            .session
            .complete_authorization("valid-code")
            .await
            .expect("authorization succeeds");
        harness
    }

    pub fn dispatcher(&self, hostname: Option<&str>) -> CommandDispatcher {
        CommandDispatcher::with_hostname(
            self.session.clone(),
            self.api.clone(),
            Arc::clone(&self.reconciler),
            hostname.map(str::to_string),
        )
    }
}

/// A local file: no catalog id, no artwork.
pub fn local_track(uri: &str, title: &str) -> Track {
    Track {
        id: None,
        uri: uri.to_string(),
        is_local: true,
        name: title.to_string(),
        artists: vec![artist("Home Recording")],
        album: Album {
            name: "Demos".to_string(),
            artists: Vec::new(),
            images: Vec::new(),
        },
        track_number: 0,
        duration_ms: 184_000,
        preview_url: None,
    }
}
