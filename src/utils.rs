use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;
use sha2::{Digest, Sha256};

/// Random value for the `state` parameter of the authorization URL.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

pub fn local_hostname() -> Option<String> {
    sysinfo::System::host_name().filter(|name| !name.is_empty())
}

/// Derives the artwork cache key for an image URL.
///
/// The key is the last non-empty path segment, since query parameters can
/// differ between runs for the same image. URLs without such a segment fall
/// back to a SHA-256 of the whole URL. Returns `None` for references that do
/// not parse as URLs.
pub fn artwork_cache_key(image_url: &str) -> Option<String> {
    let url = Url::parse(image_url).ok()?;
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|s| !s.starts_with('.'))
        .filter(|s| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .map(str::to_string);

    Some(segment.unwrap_or_else(|| hex::encode(Sha256::digest(image_url.as_bytes()))))
}
