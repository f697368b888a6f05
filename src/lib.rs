//! Spotify MPRIS Bridge Library
//!
//! This library keeps a desktop media player object in sync with the playback
//! state of a remote Spotify account. It owns the access token lifecycle,
//! reconciles polled and pushed playback state into a single published
//! snapshot, and translates transport commands (play, pause, next, previous)
//! into Web API calls.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for track notifications and the OAuth callback
//! - `config` - Configuration management and environment variables
//! - `daemon` - Process wiring: timers, server and media controls
//! - `error` - The error taxonomy shared by all components
//! - `management` - Session, credential store and artwork cache management
//! - `playback` - Playback reconciliation and command dispatch
//! - `player` - The published player state and the desktop media bridge
//! - `server` - Local HTTP listener
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod management;
pub mod playback;
pub mod player;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::SyncError;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the binary-level plumbing where errors are only reported, never
/// matched on. Component code returns [`SyncError`] instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```rust,ignore
/// info!("Listening on port {}", port);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```rust,ignore
/// success!("Authorization completed");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only used for conditions the daemon cannot run without, such as missing
/// configuration at startup.
///
/// # Example
///
/// ```rust,ignore
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Every failure that is swallowed at a reconciliation or command boundary is
/// reported through this macro.
///
/// # Example
///
/// ```rust,ignore
/// warning!("Failed to poll playback state: {}", err);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
