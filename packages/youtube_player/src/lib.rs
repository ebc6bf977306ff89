//! Command bridge between an application and YouTube players.
//!
//! [`PlayerBridge`] owns a [`registry::PlayerRegistry`] of live players, gates
//! every command on the player's ready callback, forwards structured
//! [`Command`]s to a [`PlayerBackend`] and relays the player events back to
//! subscribers through an [`relay::EventRelay`].
//!
//! Backends are selected at build time: the in-memory echo backend lives in
//! [`backends::echo`] (feature `echo`), the webview transport in the
//! `youtube_player_webview` crate, and the mobile bridge in the Tauri plugin.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error;

pub mod backend;
pub mod backends;
pub mod bridge;
pub mod call;
pub mod command;
pub mod registry;
pub mod relay;

pub use backend::{BackendError, EventSink, PlayerBackend, PlayerInstance};
pub use bridge::PlayerBridge;
pub use command::Command;
pub use relay::EventListener;
pub use youtube_player_models as models;

use registry::RegistryError;

pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
    #[error("Player '{0}' not found")]
    NotFound(String),
    #[error("Player '{0}' is not ready")]
    NotReady(String),
    #[error("Player '{0}' is already initialized")]
    DuplicateId(String),
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
    #[error("Unknown method '{0}'")]
    UnknownMethod(String),
    /// Failure raised by the underlying player, message passed through as-is
    #[error("{0}")]
    UnderlyingFailure(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<RegistryError> for BridgeError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::DuplicateId(id) => Self::DuplicateId(id),
            RegistryError::NotFound(id) => Self::NotFound(id),
        }
    }
}

impl From<BackendError> for BridgeError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Underlying(message) => Self::UnderlyingFailure(message),
            BackendError::Serialization(e) => Self::Serialization(e),
        }
    }
}
