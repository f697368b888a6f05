use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    error::SyncError,
    info,
    management::store::CredentialStore,
    spotify::AuthApi,
    types::{CachedCredentials, Credential},
    utils, warning,
};

/// Remaining lifetime below which the access token is renewed.
pub const SAFETY_MARGIN_SECS: i64 = 600;

/// Cadence of the proactive renewal timer.
pub const RENEWAL_INTERVAL: Duration = Duration::from_secs(60);

type PendingExchange = Shared<BoxFuture<'static, Result<Credential, SyncError>>>;

/// Outcome of the startup credential acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    Ready(Credential),
    /// No usable refresh token; the account owner must visit this URL.
    AwaitingAuthorization(String),
}

enum Exchange {
    Code(String),
    Refresh(String),
}

/// Owns the access token lifecycle.
///
/// At most one token exchange runs at a time. Callers arriving while an
/// exchange is in flight await the same shared future and receive its result.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Arc<dyn AuthApi>,
    store: Arc<dyn CredentialStore>,
    credential: Mutex<Option<Credential>>,
    pending: Mutex<Option<PendingExchange>>,
    grants: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<dyn CredentialStore>) -> Self {
        let (grants, _) = watch::channel(0);
        SessionManager {
            inner: Arc::new(SessionInner {
                auth,
                store,
                credential: Mutex::new(None),
                pending: Mutex::new(None),
                grants,
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.inner.credential).is_some()
    }

    pub fn current(&self) -> Option<Credential> {
        lock(&self.inner.credential).clone()
    }

    /// Notifies on every successful grant or refresh.
    pub fn subscribe_grants(&self) -> watch::Receiver<u64> {
        self.inner.grants.subscribe()
    }

    pub fn authorization_url(&self) -> String {
        self.inner.auth.authorize_url(&utils::generate_state())
    }

    /// Obtains the initial credential.
    ///
    /// Uses the persisted refresh token when there is one. Without it, or when
    /// the remote rejects it, the session stays unauthenticated and the
    /// authorization URL is returned for the account owner.
    ///
    /// # Errors
    ///
    /// A [`SyncError::Transient`] failure keeps the persisted refresh token
    /// seeded so the renewal timer retries it.
    pub async fn acquire(&self) -> Result<Acquired, SyncError> {
        if !self.is_authenticated() {
            match self.inner.store.load().await {
                Ok(Some(cached)) => {
                    *lock(&self.inner.credential) =
                        Some(Credential::from_refresh_token(cached.refresh_token));
                }
                Ok(None) => return Ok(Acquired::AwaitingAuthorization(self.authorization_url())),
                Err(e) => {
                    warning!("Failed to read stored refresh token: {}", e);
                    return Ok(Acquired::AwaitingAuthorization(self.authorization_url()));
                }
            }
        }

        match self.ensure_fresh().await {
            Ok(credential) => Ok(Acquired::Ready(credential)),
            Err(SyncError::Refresh(msg)) => {
                warning!("Stored refresh token was rejected: {}", msg);
                Ok(Acquired::AwaitingAuthorization(self.authorization_url()))
            }
            Err(e) => Err(e),
        }
    }

    /// Exchanges a one-time authorization code and persists the refresh token.
    ///
    /// Waits for any exchange already in flight before starting its own.
    pub async fn complete_authorization(&self, code: &str) -> Result<Credential, SyncError> {
        loop {
            let (exchange, mine) = {
                let mut pending = lock(&self.inner.pending);
                match pending.clone() {
                    Some(in_flight) => (in_flight, false),
                    None => {
                        let exchange = self.start(Exchange::Code(code.to_string()));
                        *pending = Some(exchange.clone());
                        (exchange, true)
                    }
                }
            };

            let result = exchange.await;
            if mine {
                return result;
            }
        }
    }

    /// Returns a credential with more than [`SAFETY_MARGIN_SECS`] left,
    /// refreshing it first if necessary.
    pub async fn ensure_fresh(&self) -> Result<Credential, SyncError> {
        let exchange = {
            let mut pending = lock(&self.inner.pending);
            match pending.clone() {
                Some(in_flight) => in_flight,
                None => {
                    let credential = lock(&self.inner.credential)
                        .clone()
                        .ok_or(SyncError::Unauthenticated)?;
                    if credential.remaining_secs(utils::now_epoch()) > SAFETY_MARGIN_SECS {
                        return Ok(credential);
                    }

                    let exchange = self.start(Exchange::Refresh(credential.refresh_token));
                    *pending = Some(exchange.clone());
                    exchange
                }
            }
        };

        exchange.await
    }

    /// Marks the access token as expired after the Web API refused it.
    pub fn invalidate_access_token(&self) {
        if let Some(credential) = lock(&self.inner.credential).as_mut() {
            credential.expires_at = 0;
        }
    }

    /// Runs `ensure_fresh` on a fixed cadence for the lifetime of the process.
    pub fn spawn_renewal(&self, period: Duration) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match session.ensure_fresh().await {
                    Ok(_) | Err(SyncError::Unauthenticated) => {}
                    Err(e) => warning!("Failed to refresh token: {}", e),
                }
            }
        })
    }

    fn start(&self, exchange: Exchange) -> PendingExchange {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = inner.perform(exchange).await;
            lock(&inner.pending).take();
            result
        }
        .boxed()
        .shared()
    }
}

impl SessionInner {
    async fn perform(&self, exchange: Exchange) -> Result<Credential, SyncError> {
        let credential = match exchange {
            Exchange::Code(code) => {
                let grant = self.auth.exchange_code(&code).await?;
                let refresh_token = grant.refresh_token.filter(|t| !t.is_empty()).ok_or_else(|| {
                    SyncError::AuthExchange("token response carried no refresh token".to_string())
                })?;

                self.persist(&refresh_token).await;
                info!("Authorization completed");
                Credential {
                    access_token: grant.access_token,
                    refresh_token,
                    expires_at: utils::now_epoch() + grant.expires_in,
                }
            }
            Exchange::Refresh(refresh_token) => match self.auth.refresh(&refresh_token).await {
                Ok(grant) => {
                    let rotated = grant.refresh_token.filter(|t| !t.is_empty());
                    if let Some(rotated) = &rotated {
                        self.persist(rotated).await;
                    }

                    info!("Access token refreshed");
                    Credential {
                        access_token: grant.access_token,
                        refresh_token: rotated.unwrap_or(refresh_token),
                        expires_at: utils::now_epoch() + grant.expires_in,
                    }
                }
                Err(err @ SyncError::Refresh(_)) => {
                    lock(&self.credential).take();
                    if let Err(e) = self.store.clear().await {
                        warning!("Failed to clear stale refresh token: {}", e);
                    }
                    warning!(
                        "Session ended, authorize again at: {}",
                        self.auth.authorize_url(&utils::generate_state())
                    );
                    return Err(err);
                }
                Err(e) => return Err(e),
            },
        };

        *lock(&self.credential) = Some(credential.clone());
        self.grants.send_modify(|generation| *generation += 1);
        Ok(credential)
    }

    async fn persist(&self, refresh_token: &str) {
        let cached = CachedCredentials {
            refresh_token: refresh_token.to_string(),
        };
        if let Err(e) = self.store.save(&cached).await {
            warning!("Failed to persist refresh token: {}", e);
        }
    }
}
