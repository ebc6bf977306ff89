use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tauri::{
    AppHandle, Runtime,
    ipc::{Channel, InvokeResponseBody},
    plugin::{PluginApi, PluginHandle},
};
use youtube_player::{BackendError, Command, EventSink, PlayerBackend, PlayerInstance};
use youtube_player_models::{CommandResult, PlayerEvent, PlayerEventPayload, PlayerOptions};

use crate::models::mobile::{CallPlayer, CreatePlayer, ReleasePlayer};

#[cfg(target_os = "android")]
const PLUGIN_IDENTIFIER: &str = "com.moosicbox.youtubeplayerplugin";

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_youtube_player);

pub type Backend<R> = MobileBackend<R>;

// initializes the Kotlin or Swift plugin classes
pub fn init<R: Runtime, C: DeserializeOwned>(
    _app: &AppHandle<R>,
    api: &PluginApi<R, C>,
) -> crate::Result<Backend<R>> {
    #[cfg(target_os = "android")]
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "YoutubePlayerPlugin")?;
    #[cfg(target_os = "ios")]
    let handle = api.register_ios_plugin(init_plugin_youtube_player)?;
    Ok(MobileBackend(handle))
}

fn invoke_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::Underlying(e.to_string())
}

/// Native YouTube players reached through the mobile plugin.
pub struct MobileBackend<R: Runtime>(PluginHandle<R>);

#[async_trait]
impl<R: Runtime> PlayerBackend for MobileBackend<R> {
    type Instance = MobileInstance<R>;

    async fn create(
        &self,
        options: &PlayerOptions,
        sink: EventSink,
    ) -> Result<Self::Instance, BackendError> {
        let channel = Channel::new(move |body: InvokeResponseBody| {
            let payload: PlayerEventPayload = body.deserialize()?;
            match PlayerEvent::try_from(payload) {
                Ok(event) => {
                    sink.emit(event.data);
                }
                Err(e) => log::warn!("Dropping malformed event of {}: {e}", sink.player_id()),
            }
            Ok(())
        });

        let _: Value = self
            .0
            .run_mobile_plugin_async("initialize", CreatePlayer { options, channel })
            .await
            .map_err(invoke_error)?;

        Ok(MobileInstance {
            handle: self.0.clone(),
            player_id: options.player_id.clone(),
        })
    }
}

/// One native player.
pub struct MobileInstance<R: Runtime> {
    handle: PluginHandle<R>,
    player_id: String,
}

#[async_trait]
impl<R: Runtime> PlayerInstance for MobileInstance<R> {
    async fn call(&self, command: &Command) -> Result<CommandResult, BackendError> {
        let request = CallPlayer {
            player_id: &self.player_id,
            method: command.name(),
            args: command.args()?,
        };

        self.handle
            .run_mobile_plugin_async("call", request)
            .await
            .map_err(invoke_error)
    }

    async fn release(&self) -> Result<(), BackendError> {
        let _: Value = self
            .handle
            .run_mobile_plugin_async(
                "destroy",
                ReleasePlayer {
                    player_id: &self.player_id,
                },
            )
            .await
            .map_err(invoke_error)?;

        Ok(())
    }
}
