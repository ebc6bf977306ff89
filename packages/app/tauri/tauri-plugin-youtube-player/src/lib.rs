//! Tauri plugin embedding YouTube players.
//!
//! Every player is addressed by a caller-chosen `playerId`. The plugin owns a
//! [`PlayerBridge`] that keeps the live players, rejects commands until a
//! player reported `onReady`, and relays player events to the frontend
//! channels subscribed with `add_event_listener`.
//!
//! # Usage
//!
//! ```rust,ignore
//! tauri::Builder::default()
//!     .plugin(app_tauri_plugin_youtube_player::init())
//!     .run(tauri::generate_context!())
//!     .expect("error while running tauri application");
//! ```
//!
//! # Platform Support
//!
//! * **Desktop**: each player gets its own webview window showing a document
//!   served from the `ytplayer` URI scheme. The app capability must grant
//!   `youtube-player:allow-bridge-message` to the `youtube-player-*` windows.
//! * **Mobile** (iOS/Android): commands go to the native plugin, which reports
//!   events through a channel handed over at `initialize`.
//!
//! Defaults from `config.json5` in the config directory (see
//! `youtube_player_config`) fill the options the caller leaves unset.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tauri::{
    Manager, Runtime,
    ipc::Channel,
    plugin::{Builder, TauriPlugin},
};
use tokio_util::sync::CancellationToken;
use youtube_player::{
    BridgeError, EventListener, PlayerBridge,
    call::{initialize_options, parse_event, player_id_param},
    models::{PlayerEvent, PlayerEventKind},
};
use youtube_player_config::file::{PlayerDefaults, PluginConfig};
use youtube_player_logging::debug_or_trace;

pub use models::*;

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod commands;
mod error;
mod models;

pub use error::{Error, Result};

#[cfg(desktop)]
pub use desktop::{Backend, TauriScriptHost, URI_SCHEME};
#[cfg(mobile)]
pub use mobile::{Backend, MobileBackend, MobileInstance};

type ListenerKey = (String, PlayerEventKind, u32);

/// Plugin state: the bridge plus the frontend channels subscribed to it.
pub struct YoutubePlayer<R: Runtime> {
    bridge: Arc<PlayerBridge<Backend<R>>>,
    defaults: Option<PlayerDefaults>,
    listeners: Mutex<BTreeMap<ListenerKey, EventListener>>,
    token: CancellationToken,
}

impl<R: Runtime> YoutubePlayer<R> {
    fn new(backend: Backend<R>, defaults: Option<PlayerDefaults>) -> Self {
        let bridge = Arc::new(PlayerBridge::new(backend));
        let token = CancellationToken::new();

        let tauri::async_runtime::RuntimeHandle::Tokio(handle) = tauri::async_runtime::handle();
        let _guard = handle.enter();
        bridge.start_event_loop(token.clone());

        Self {
            bridge,
            defaults,
            listeners: Mutex::new(BTreeMap::new()),
            token,
        }
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<PlayerBridge<Backend<R>>> {
        &self.bridge
    }

    fn listeners(&self) -> MutexGuard<'_, BTreeMap<ListenerKey, EventListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// # Errors
    ///
    /// * If the options are incomplete or the id is already in use
    /// * If the backend fails to create the player
    pub async fn initialize(&self, mut options: PlayerOptions) -> Result<InitializeResponse> {
        if let Some(defaults) = &self.defaults {
            defaults.apply(&mut options);
        }

        Ok(self.bridge.initialize(options).await?)
    }

    /// Destroys the player and drops the frontend channels subscribed to it.
    ///
    /// # Errors
    ///
    /// * If no player has this id
    /// * If the player failed to tear down; it is removed regardless
    pub async fn destroy(&self, player_id: &str) -> Result<CallResponse> {
        let response = self.bridge.destroy(player_id).await;

        if !matches!(response, Err(BridgeError::NotFound(_))) {
            self.listeners().retain(|(id, _, _), _| id != player_id);
        }

        Ok(response?)
    }

    /// Dispatches one method of the call surface.
    ///
    /// # Errors
    ///
    /// * If the method is unknown or its parameters are invalid
    /// * If the player is missing, not ready, or the call failed
    pub async fn call(&self, method: &str, params: &Value) -> Result<Value> {
        debug_or_trace!(
            ("call: method={method}"),
            ("call: method={method} params={params}")
        );

        match method {
            "initialize" => {
                let response = self.initialize(initialize_options(params)?).await?;
                Ok(serde_json::to_value(response).map_err(BridgeError::from)?)
            }
            "destroy" => {
                let response = self.destroy(player_id_param(params)?).await?;
                Ok(serde_json::to_value(response).map_err(BridgeError::from)?)
            }
            _ => Ok(self.bridge.call(method, params).await?),
        }
    }

    /// Forwards the `event` events of `player_id` to `channel`.
    ///
    /// The player does not need to exist yet. Subscribing the same channel
    /// twice replaces the first subscription.
    ///
    /// # Errors
    ///
    /// * If `event` is not a player event name
    pub fn add_event_listener(
        &self,
        player_id: &str,
        event: &str,
        channel: Channel<PlayerEventPayload>,
    ) -> Result<()> {
        let kind = parse_event(event)?;
        let key = (player_id.to_string(), kind, channel.id());

        let listener: EventListener = Arc::new(move |event: &PlayerEvent| {
            if let Err(e) = channel.send(PlayerEventPayload::from(event.clone())) {
                log::warn!(
                    "Failed to send {} of player_id={} to channel: {e:?}",
                    event.kind(),
                    event.player_id
                );
            }
        });

        let mut listeners = self.listeners();
        if let Some(previous) = listeners.insert(key, listener.clone()) {
            self.bridge.remove_event_listener(player_id, kind, &previous);
        }
        self.bridge.add_event_listener(player_id, kind, listener);

        Ok(())
    }

    /// Returns `false` if the channel was not subscribed.
    ///
    /// # Errors
    ///
    /// * If `event` is not a player event name
    pub fn remove_event_listener(
        &self,
        player_id: &str,
        event: &str,
        channel_id: u32,
    ) -> Result<bool> {
        let kind = parse_event(event)?;
        let key = (player_id.to_string(), kind, channel_id);

        Ok(self
            .listeners()
            .remove(&key)
            .is_some_and(|listener| self.bridge.remove_event_listener(player_id, kind, &listener)))
    }

    /// # Errors
    ///
    /// * If the state fails to serialize
    pub fn all_players_events_state(&self) -> Result<CallResponse> {
        let state = serde_json::to_value(self.bridge.all_players_events_state())
            .map_err(BridgeError::from)?;

        Ok(CallResponse::new("getAllPlayersEventsState", state))
    }

    /// Routes a message posted by the player window labelled `label`.
    ///
    /// # Errors
    ///
    /// * If no player lives in that window
    /// * If the message is malformed or answers nothing
    #[cfg(desktop)]
    pub fn bridge_message(&self, label: &str, message: &str) -> Result<()> {
        let backend = self.bridge.backend();
        let player_id = backend.host().player_for_label(label).ok_or_else(|| {
            youtube_player_webview::WebViewError::UnknownPlayer(label.to_string())
        })?;

        backend.handle_message_from(&player_id, message)?;

        Ok(())
    }

    /// Destroys every player and stops relaying events.
    pub async fn shutdown(&self) {
        self.bridge.shutdown().await;
        self.listeners().clear();
        self.token.cancel();
    }
}

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the player APIs.
pub trait YoutubePlayerExt<R: Runtime> {
    fn youtube_player(&self) -> &YoutubePlayer<R>;
}

impl<R: Runtime, T: Manager<R>> crate::YoutubePlayerExt<R> for T {
    fn youtube_player(&self) -> &YoutubePlayer<R> {
        self.state::<YoutubePlayer<R>>().inner()
    }
}

fn load_config() -> PluginConfig {
    youtube_player_config::file::load_config().unwrap_or_else(|e| {
        log::warn!("Failed to load youtube player config, using no defaults: {e}");
        PluginConfig::default()
    })
}

/// Initializes the plugin.
#[must_use]
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    let builder = Builder::new("youtube-player").invoke_handler(tauri::generate_handler![
        commands::initialize,
        commands::destroy,
        commands::call,
        commands::add_event_listener,
        commands::remove_event_listener,
        commands::get_all_players_events_state,
        commands::get_plugin_version,
        commands::bridge_message,
    ]);

    #[cfg(desktop)]
    let builder = builder.register_uri_scheme_protocol(URI_SCHEME, desktop::serve_document);

    builder
        .setup(|app, api| {
            #[cfg(mobile)]
            let backend = mobile::init(app, &api)?;
            #[cfg(desktop)]
            let backend = desktop::init(app, &api);

            let config = load_config();
            app.manage(YoutubePlayer::new(backend, config.defaults));
            Ok(())
        })
        .on_event(|app, event| {
            if let tauri::RunEvent::Exit = event
                && let Some(player) = app.try_state::<YoutubePlayer<R>>()
            {
                log::debug!("youtube-player: releasing players on exit");
                tauri::async_runtime::block_on(player.shutdown());
            }
        })
        .on_drop(|app| {
            if let Some(player) = app.try_state::<YoutubePlayer<R>>() {
                log::debug!("youtube-player: stopping event relay");
                player.token.cancel();
            }
        })
        .build()
}
