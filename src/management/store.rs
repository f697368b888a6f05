use std::path::PathBuf;

use async_trait::async_trait;
use keyring::Entry;

use crate::{config, error::SyncError, types::CachedCredentials};

const REFRESH_TOKEN_ACCOUNT: &str = "refresh_token";

/// Persistence for the long-lived refresh token.
///
/// Only the refresh token survives a restart. Access tokens are short-lived
/// and always obtained again through a refresh.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the cached credentials.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the backend cannot be read or holds
    /// data that does not parse.
    async fn load(&self) -> Result<Option<CachedCredentials>, SyncError>;

    /// Replaces whatever was stored before.
    async fn save(&self, credentials: &CachedCredentials) -> Result<(), SyncError>;

    /// Removes the stored credentials. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<(), SyncError>;
}

/// Looks up the app's client secret in the OS keyring.
///
/// The secret is stored under the `spotmpris` service with the client id as
/// the account name, e.g. with
/// `secret-tool store --label='spotmpris/<client id>' service spotmpris username <client id>`.
///
/// This call blocks on the secret service; run it off the async runtime.
///
/// # Arguments
///
/// * `client_id` - The Spotify application's client id
///
/// # Returns
///
/// The secret, or `None` if no entry exists for `client_id`.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the keyring is unavailable.
pub fn lookup_client_secret(client_id: &str) -> Result<Option<String>, SyncError> {
    read_entry(client_id)
}

fn keyring_entry(account: &str) -> Result<Entry, SyncError> {
    Entry::new(config::APP_NAME, account)
        .map_err(|err| SyncError::Store(format!("failed to create keyring entry: {err}")))
}

fn read_entry(account: &str) -> Result<Option<String>, SyncError> {
    let entry = keyring_entry(account)?;
    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(SyncError::Store(format!(
            "failed to get keyring password: {err}"
        ))),
    }
}

/// Stores the refresh token in the OS secret service.
///
/// Every keyring call runs on the blocking thread pool.
#[derive(Debug, Default, Clone)]
pub struct KeyringCredentialStore;

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn load(&self) -> Result<Option<CachedCredentials>, SyncError> {
        let token = tokio::task::spawn_blocking(|| read_entry(REFRESH_TOKEN_ACCOUNT))
            .await
            .map_err(|e| SyncError::Store(e.to_string()))??;
        Ok(token.map(|refresh_token| CachedCredentials { refresh_token }))
    }

    async fn save(&self, credentials: &CachedCredentials) -> Result<(), SyncError> {
        let token = credentials.refresh_token.clone();
        tokio::task::spawn_blocking(move || {
            keyring_entry(REFRESH_TOKEN_ACCOUNT)?
                .set_password(&token)
                .map_err(|err| SyncError::Store(format!("failed to set keyring password: {err}")))
        })
        .await
        .map_err(|e| SyncError::Store(e.to_string()))?
    }

    async fn clear(&self) -> Result<(), SyncError> {
        tokio::task::spawn_blocking(|| {
            match keyring_entry(REFRESH_TOKEN_ACCOUNT)?.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(err) => Err(SyncError::Store(format!(
                    "failed to delete keyring password: {err}"
                ))),
            }
        })
        .await
        .map_err(|e| SyncError::Store(e.to_string()))?
    }
}

/// Stores the refresh token as JSON in the local data directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(config::data_dir().join("cache/token.json"))
    }
}

impl FileCredentialStore {
    /// Creates a store backed by the JSON file at `path`.
    ///
    /// Missing parent directories are created on the first save.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use spotmpris::management::FileCredentialStore;
    ///
    /// let store = FileCredentialStore::new("/tmp/spotmpris/token.json".into());
    /// assert!(store.path().ends_with("token.json"));
    /// ```
    pub fn new(path: PathBuf) -> Self {
        FileCredentialStore { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<CachedCredentials>, SyncError> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let content = async_fs::read_to_string(&self.path)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;
        let cached: CachedCredentials =
            serde_json::from_str(&content).map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(Some(cached))
    }

    async fn save(&self, credentials: &CachedCredentials) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Store(e.to_string()))?;
        }

        let json =
            serde_json::to_string_pretty(credentials).map_err(|e| SyncError::Store(e.to_string()))?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))
    }

    async fn clear(&self) -> Result<(), SyncError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Store(e.to_string())),
        }
    }
}
