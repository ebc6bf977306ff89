use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use youtube_player_models::{
    CallResponse, InitializeResponse, PlayerEventPayload, PlayerEventsState, PlayerOptions,
    PluginVersion,
};

/// One call of the generic call surface, e.g. `{method: "seekTo", params:
/// {playerId, seconds, allowSeekAhead}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[cfg(mobile)]
pub(crate) mod mobile {
    use serde::Serialize;
    use serde_json::Value;
    use tauri::ipc::Channel;
    use youtube_player_models::PlayerOptions;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreatePlayer<'a> {
        #[serde(flatten)]
        pub options: &'a PlayerOptions,
        pub channel: Channel,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CallPlayer<'a> {
        pub player_id: &'a str,
        pub method: &'a str,
        pub args: Vec<Value>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReleasePlayer<'a> {
        pub player_id: &'a str,
    }
}
