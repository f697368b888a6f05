//! # API Module
//!
//! HTTP endpoints served by the bridge's local listener.
//!
//! ## Endpoints
//!
//! ### Notifications
//!
//! - [`track`] - `PUT /track/{track_id}?event=...`. An external source (for
//!   example a player hook) announces that a track started, changed, paused or
//!   stopped. The track is looked up by id and published with the implied
//!   status. `200` on success, `500` if the lookup fails.
//!
//! ### Authentication
//!
//! - [`callback`] - `GET /auth/spotify/callback?code=...`. Completes the
//!   authorization code grant started from the printed authorization URL.
//!   `200` on success, `500` on a missing or rejected code.
//!
//! ### Monitoring
//!
//! - [`health`] - `GET /health`. Version and whether a session exists.
//!
//! ## Architecture
//!
//! Handlers are thin: they extract parameters, call into the session manager
//! or the reconciler through the shared [`AppState`], and map the outcome to a
//! status code. No handler failure reaches the server loop.
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::{get, put}};
//! use spotmpris::api::{callback, health, track};
//!
//! let app = Router::new()
//!     .route("/track/{track_id}", put(track))
//!     .route("/auth/spotify/callback", get(callback))
//!     .route("/health", get(health))
//!     .layer(Extension(state));
//! ```

use std::sync::Arc;

use crate::{management::SessionManager, playback::Reconciler};

mod callback;
mod health;
mod track;

pub use callback::callback;
pub use health::health;
pub use track::track;

/// Shared handles the handlers work with.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionManager,
    pub reconciler: Arc<Reconciler>,
}
