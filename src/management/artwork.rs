use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{config, error::SyncError, utils};

/// Maps a remote image reference to a locally dereferenceable URI.
#[async_trait]
pub trait ArtworkResolver: Send + Sync {
    async fn resolve(&self, image_url: &str) -> Result<String, SyncError>;
}

/// Downloads album art once and serves it from a temp directory as `file://` URIs.
///
/// Files are named `spotify-<key>.jpeg` where the key comes from
/// [`utils::artwork_cache_key`]. Rotating path segments for the same image
/// would defeat the cache; it is a heuristic, not a content hash.
#[derive(Debug, Clone)]
pub struct ArtworkCache {
    client: Client,
    dir: PathBuf,
}

impl ArtworkCache {
    /// Cache under `<temp dir>/spotmpris`.
    pub fn new(client: Client) -> Self {
        Self::with_dir(client, std::env::temp_dir().join(config::APP_NAME))
    }

    pub fn with_dir(client: Client, dir: PathBuf) -> Self {
        ArtworkCache { client, dir }
    }

    /// Final location of the image cached under `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("spotify-{}.jpeg", key))
    }

    async fn download(&self, image_url: &str, path: &Path) -> Result<(), SyncError> {
        async_fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let bytes = self
            .client
            .get(image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // readers only ever see complete files under the final name
        let partial = self
            .dir
            .join(format!(".spotify-{}.part", utils::generate_state()));
        let written = match async_fs::write(&partial, &bytes).await {
            Ok(()) => async_fs::rename(&partial, path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            let _ = async_fs::remove_file(&partial).await;
            return Err(SyncError::Store(e.to_string()));
        }
        Ok(())
    }
}

fn file_uri(path: &Path) -> Result<String, SyncError> {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| SyncError::Store(format!("not an absolute path: {}", path.display())))
}

#[async_trait]
impl ArtworkResolver for ArtworkCache {
    async fn resolve(&self, image_url: &str) -> Result<String, SyncError> {
        let Some(key) = utils::artwork_cache_key(image_url) else {
            return Ok(image_url.to_string());
        };

        let path = self.path_for(&key);
        if !path.is_file() {
            self.download(image_url, &path).await?;
        }

        file_uri(&path)
    }
}
