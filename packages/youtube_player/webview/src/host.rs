use async_trait::async_trait;
use thiserror::Error;
use youtube_player_models::PlayerOptions;

use crate::cookies::Cookie;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostError(pub String);

/// The UI layer that shows player documents.
///
/// Implemented by the Tauri plugin on desktop; tests provide in-memory hosts.
#[async_trait]
pub trait ScriptHost: Send + Sync + 'static {
    /// Shows `document` in a new surface for `options.player_id`.
    ///
    /// # Errors
    ///
    /// * If the surface could not be created
    async fn open_surface(&self, options: &PlayerOptions, document: String)
    -> Result<(), HostError>;

    /// Runs `script` in the surface of `player_id`.
    ///
    /// # Errors
    ///
    /// * If the surface is gone or rejected the script
    async fn evaluate(&self, player_id: &str, script: &str) -> Result<(), HostError>;

    /// # Errors
    ///
    /// * If the surface failed to close
    async fn close_surface(&self, player_id: &str) -> Result<(), HostError>;

    /// Stores `cookies` for every domain in
    /// [`COOKIE_DOMAINS`](crate::cookies::COOKIE_DOMAINS) before the surface
    /// opens.
    ///
    /// # Errors
    ///
    /// * If the host has no cookie store it can write to
    async fn set_cookies(&self, player_id: &str, cookies: &[Cookie]) -> Result<(), HostError>;
}
