//! WebView transport for the YouTube player bridge.
//!
//! Each player lives in its own webview surface showing a generated document
//! that hosts the IFrame API player. Commands travel into the page as
//! evaluated scripts ([`script`]); results and player events travel back as
//! JSON messages ([`message`]) fed to [`backend::WebViewBackend::handle_message`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error;
use youtube_player_models::EventDataError;

pub mod backend;
pub mod cookies;
pub mod document;
pub mod escape;
pub mod host;
pub mod message;
pub mod script;

pub use backend::{WebViewBackend, WebViewInstance};
pub use host::{HostError, ScriptHost};

#[derive(Debug, Error)]
pub enum WebViewError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    EventData(#[from] EventDataError),
    #[error("No pending call with id {0}")]
    UnknownCallId(u64),
    #[error("No webview player '{0}'")]
    UnknownPlayer(String),
}
