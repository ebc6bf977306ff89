use serde::{Serialize, ser::Serializer};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bridge(#[from] youtube_player::BridgeError),
    #[error(transparent)]
    Tauri(#[from] tauri::Error),
    #[cfg(desktop)]
    #[error(transparent)]
    WebView(#[from] youtube_player_webview::WebViewError),
    #[cfg(mobile)]
    #[error(transparent)]
    PluginInvoke(#[from] tauri::plugin::mobile::PluginInvokeError),
}

/// Errors reach the frontend as their message.
impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
