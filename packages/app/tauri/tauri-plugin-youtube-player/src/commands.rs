//! Tauri command handlers for the player plugin.

use serde_json::Value;
use tauri::{AppHandle, Runtime, command, ipc::Channel};

use crate::{
    Result, YoutubePlayerExt as _,
    models::{
        CallRequest, CallResponse, InitializeResponse, PlayerEventPayload, PlayerOptions,
        PluginVersion,
    },
};

/// Creates a player; commands are accepted once its `onReady` event fired.
///
/// # Errors
///
/// * If the options are incomplete or the id is already in use
/// * If the player surface could not be created
#[command]
pub async fn initialize<R: Runtime>(
    app: AppHandle<R>,
    options: PlayerOptions,
) -> Result<InitializeResponse> {
    app.youtube_player().initialize(options).await
}

/// # Errors
///
/// * If no player has this id
/// * If the player failed to tear down; it is removed regardless
#[command]
pub async fn destroy<R: Runtime>(app: AppHandle<R>, player_id: String) -> Result<CallResponse> {
    app.youtube_player().destroy(&player_id).await
}

/// Dispatches any method of the call surface by name.
///
/// # Errors
///
/// * If the method is unknown or its parameters are invalid
/// * If the player is missing, not ready, or the call failed
#[command]
pub async fn call<R: Runtime>(app: AppHandle<R>, payload: CallRequest) -> Result<Value> {
    app.youtube_player()
        .call(&payload.method, &payload.params)
        .await
}

/// # Errors
///
/// * If `event` is not a player event name
#[command]
pub async fn add_event_listener<R: Runtime>(
    app: AppHandle<R>,
    player_id: String,
    event: String,
    handler: Channel<PlayerEventPayload>,
) -> Result<()> {
    app.youtube_player()
        .add_event_listener(&player_id, &event, handler)
}

/// Returns whether `handler` was subscribed.
///
/// # Errors
///
/// * If `event` is not a player event name
#[command]
pub async fn remove_event_listener<R: Runtime>(
    app: AppHandle<R>,
    player_id: String,
    event: String,
    handler: Channel<PlayerEventPayload>,
) -> Result<bool> {
    app.youtube_player()
        .remove_event_listener(&player_id, &event, handler.id())
}

/// # Errors
///
/// * If the state fails to serialize
#[command]
pub async fn get_all_players_events_state<R: Runtime>(app: AppHandle<R>) -> Result<CallResponse> {
    app.youtube_player().all_players_events_state()
}

#[command]
pub async fn get_plugin_version() -> PluginVersion {
    PluginVersion {
        version: youtube_player::PLUGIN_VERSION.to_string(),
    }
}

/// Receives results and events posted by a player window.
///
/// # Errors
///
/// * If the calling window does not host a player
/// * If the message is malformed or answers nothing
#[cfg(desktop)]
#[command]
pub async fn bridge_message<R: Runtime>(
    app: AppHandle<R>,
    webview: tauri::Webview<R>,
    message: String,
) -> Result<()> {
    app.youtube_player()
        .bridge_message(webview.label(), &message)
}

#[cfg(mobile)]
#[command]
#[allow(clippy::needless_pass_by_value)]
pub async fn bridge_message(message: String) -> Result<()> {
    log::debug!("bridge_message: ignored on mobile ({} bytes)", message.len());
    Ok(())
}
