use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::{
    Res,
    api::AppState,
    config::{Config, TokenStoreKind},
    info,
    management::{
        Acquired, ArtworkCache, CredentialStore, FileCredentialStore, KeyringCredentialStore,
        RENEWAL_INTERVAL, SessionManager,
    },
    playback::{CommandDispatcher, Reconciler},
    player::{PublishedPlayer, mpris},
    server,
    spotify::{AuthApi, PlaybackApi, SpotifyAuth, SpotifyPlayer},
    success, warning,
};

pub fn credential_store(kind: TokenStoreKind) -> Arc<dyn CredentialStore> {
    match kind {
        TokenStoreKind::Keyring => Arc::new(KeyringCredentialStore),
        TokenStoreKind::File => Arc::new(FileCredentialStore::default()),
    }
}

/// Runs the bridge until Ctrl-C or until the listener fails.
///
/// # Startup
///
/// 1. Resolve the client secret (environment or keyring)
/// 2. Acquire a credential from the stored refresh token, or print the
///    authorization URL and wait for the callback
/// 3. Start the renewal timer, the poll timer, the command loop, the media
///    controls bridge and the HTTP listener
///
/// # Errors
///
/// Fails when the configuration cannot produce any credential at all, or the
/// listener cannot bind.
pub async fn run(mut config: Config, open_browser: bool) -> Res<()> {
    config.resolve_client_secret().await?;

    let client = reqwest::Client::new();
    let auth: Arc<dyn AuthApi> = Arc::new(SpotifyAuth::new(client.clone(), &config)?);
    let api: Arc<dyn PlaybackApi> = Arc::new(SpotifyPlayer::new(client.clone(), &config.api_url));

    let session = SessionManager::new(auth, credential_store(config.token_store));
    let player = PublishedPlayer::new();
    let reconciler = Arc::new(Reconciler::new(
        session.clone(),
        Arc::clone(&api),
        Arc::new(ArtworkCache::new(client)),
        player.clone(),
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        session.clone(),
        api,
        Arc::clone(&reconciler),
    ));

    spawn_sync_on_grant(session.subscribe_grants(), Arc::clone(&reconciler));

    match session.acquire().await {
        Ok(Acquired::Ready(_)) => success!("Authenticated with stored refresh token"),
        Ok(Acquired::AwaitingAuthorization(url)) => announce_authorization(&url, open_browser),
        Err(e) => warning!("Stored session could not be refreshed yet: {}", e),
    }

    session.spawn_renewal(RENEWAL_INTERVAL);
    Arc::clone(&reconciler).spawn_polling(config.poll_interval);

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    dispatcher.spawn_command_loop(commands_rx);
    if let Err(e) = mpris::spawn(player.subscribe(), commands_tx) {
        warning!("Failed to start media controls: {}", e);
    }

    let state = AppState {
        session,
        reconciler,
    };

    tokio::select! {
        res = server::start_api_server(state, config.port) => res?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

/// Polls once after every successful grant so the player reflects the new
/// session without waiting for the next tick.
fn spawn_sync_on_grant(mut grants: watch::Receiver<u64>, reconciler: Arc<Reconciler>) {
    tokio::spawn(async move {
        while grants.changed().await.is_ok() {
            if let Err(e) = reconciler.reconcile_from_poll().await {
                warning!("Failed to sync playback after authorization: {}", e);
            }
        }
    });
}

fn announce_authorization(url: &str, open_browser: bool) {
    info!("Authorize this application by visiting:\n{}", url);
    if open_browser && webbrowser::open(url).is_err() {
        warning!("Failed to open browser. Please navigate to the URL above manually.");
    }
}
