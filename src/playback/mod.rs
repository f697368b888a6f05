//! # Playback Module
//!
//! Reconciliation of the published player state and dispatch of transport
//! commands.
//!
//! ## Reconciler
//!
//! [`Reconciler`] is driven by two independent triggers:
//! - **Poll**: `GET /me/player` on a fixed cadence (25 seconds by default)
//! - **Notification**: `PUT /track/{id}?event=...` from an external source
//!
//! Both compute a complete state and replace the published one in a single
//! step. There is no ordering between them beyond "last writer wins".
//!
//! ## Command Dispatcher
//!
//! [`CommandDispatcher`] maps play, pause, play-pause, next and previous onto
//! the Web API. When `play` is refused because the account has no active
//! device, it selects one (last known active device, then a device named like
//! this host) and transfers playback to it with autoplay.

mod commands;
mod reconciler;

pub use commands::{CommandDispatcher, TransportCommand, select_device};
pub use reconciler::{Reconciler, TrackEvent, metadata_from_track};
