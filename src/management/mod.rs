mod artwork;
mod auth;
pub mod store;

pub use artwork::{ArtworkCache, ArtworkResolver};
pub use auth::{Acquired, RENEWAL_INTERVAL, SAFETY_MARGIN_SECS, SessionManager};
pub use store::{CredentialStore, FileCredentialStore, KeyringCredentialStore};
