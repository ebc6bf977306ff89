//! String-keyed entry point mirroring the plugin call surface.
//!
//! Parameters arrive as the JSON object the frontend sent (`{playerId, ...}`)
//! and are validated before anything reaches a player.

use std::str::FromStr as _;

use serde_json::{Value, json};
use youtube_player_models::{CallResponse, PlayerEventKind, PlayerOptions, PluginVersion};

use crate::{
    BridgeError, EventListener, PLUGIN_VERSION, backend::PlayerBackend, bridge::PlayerBridge,
    command::Command,
};

/// Parses an event name such as `onStateChange`.
///
/// # Errors
///
/// * [`BridgeError::UnknownEvent`] if `name` is not a player event
pub fn parse_event(name: &str) -> Result<PlayerEventKind, BridgeError> {
    PlayerEventKind::from_str(name).map_err(|_| BridgeError::UnknownEvent(name.to_string()))
}

/// Reads the required `playerId` parameter.
///
/// # Errors
///
/// * [`BridgeError::MissingParameter`] if it is absent or empty
/// * [`BridgeError::InvalidParameter`] if it is not a string
pub fn player_id_param(params: &Value) -> Result<&str, BridgeError> {
    match params.get("playerId") {
        None | Some(Value::Null) => Err(BridgeError::MissingParameter("playerId".to_string())),
        Some(Value::String(id)) if id.is_empty() => {
            Err(BridgeError::MissingParameter("playerId".to_string()))
        }
        Some(Value::String(id)) => Ok(id),
        Some(other) => Err(BridgeError::InvalidParameter {
            name: "playerId".to_string(),
            message: format!("expected a string, got {other}"),
        }),
    }
}

/// Validates and parses the options object passed to `initialize`.
///
/// # Errors
///
/// * [`BridgeError::MissingParameter`] if a required option is absent
/// * [`BridgeError::InvalidParameter`] if an option has the wrong shape
pub fn initialize_options(params: &Value) -> Result<PlayerOptions, BridgeError> {
    for name in ["playerId", "videoId", "playerSize"] {
        if params.get(name).is_none_or(Value::is_null) {
            return Err(BridgeError::MissingParameter(name.to_string()));
        }
    }

    serde_json::from_value(params.clone()).map_err(|e| BridgeError::InvalidParameter {
        name: "options".to_string(),
        message: e.to_string(),
    })
}

impl<B: PlayerBackend> PlayerBridge<B> {
    /// Dispatches one plugin call by method name.
    ///
    /// Returns the JSON response the frontend receives.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::UnknownMethod`] if `method` is not part of the call surface
    /// * [`BridgeError::MissingParameter`] or [`BridgeError::InvalidParameter`]
    ///   if `params` do not fit the method, before any player is touched
    /// * Any error of the operation itself
    pub async fn call(&self, method: &str, params: &Value) -> Result<Value, BridgeError> {
        log::trace!("call: method={method} params={params}");

        let response = match method {
            "initialize" => {
                let options = initialize_options(params)?;
                return Ok(serde_json::to_value(self.initialize(options).await?)?);
            }
            "destroy" => self.destroy(player_id_param(params)?).await?,
            "getPluginVersion" => {
                return Ok(serde_json::to_value(PluginVersion {
                    version: PLUGIN_VERSION.to_string(),
                })?);
            }
            "getAllPlayersEventsState" => CallResponse::new(
                method,
                serde_json::to_value(self.all_players_events_state())?,
            ),
            _ => {
                let command = Command::from_call(method, params)?;
                let player_id = player_id_param(params)?;
                self.execute(player_id, command).await?
            }
        };

        Ok(serde_json::to_value(response)?)
    }

    /// Subscribes `listener` to the event named `event`.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::UnknownEvent`] if `event` is not a player event
    pub fn add_event_listener_by_name(
        &self,
        player_id: &str,
        event: &str,
        listener: EventListener,
    ) -> Result<(), BridgeError> {
        self.add_event_listener(player_id, parse_event(event)?, listener);
        Ok(())
    }

    /// # Errors
    ///
    /// * [`BridgeError::UnknownEvent`] if `event` is not a player event
    pub fn remove_event_listener_by_name(
        &self,
        player_id: &str,
        event: &str,
        listener: &EventListener,
    ) -> Result<bool, BridgeError> {
        Ok(self.remove_event_listener(player_id, parse_event(event)?, listener))
    }
}

/// Error payload as the frontend receives it.
#[must_use]
pub fn error_value(error: &BridgeError) -> Value {
    json!({ "error": error.to_string() })
}

#[cfg(all(test, feature = "echo"))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backends::echo::EchoBackend;

    async fn initialized() -> PlayerBridge<EchoBackend> {
        let bridge = PlayerBridge::new(EchoBackend::new().with_auto_ready());
        bridge
            .call(
                "initialize",
                &json!({
                    "playerId": "p1",
                    "videoId": "dQw4w9WgXcQ",
                    "playerSize": {"width": 640, "height": 360},
                }),
            )
            .await
            .unwrap();
        bridge.process_pending_events();
        bridge
    }

    #[test_log::test(tokio::test)]
    async fn initialize_requires_its_options() {
        let bridge = PlayerBridge::new(EchoBackend::new());

        let result = bridge
            .call("initialize", &json!({"playerId": "p1", "playerSize": {"width": 1, "height": 1}}))
            .await;

        assert!(matches!(result, Err(BridgeError::MissingParameter(name)) if name == "videoId"));
        assert!(bridge.backend().created().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn initialize_answers_with_player_id() {
        let bridge = PlayerBridge::new(EchoBackend::new());

        let response = bridge
            .call(
                "initialize",
                &json!({"playerId": "p1", "videoId": "v", "playerSize": {"width": 1, "height": 1}}),
            )
            .await
            .unwrap();

        assert_eq!(response, json!({"playerReady": false, "player": "p1"}));
    }

    #[test_log::test(tokio::test)]
    async fn missing_parameters_never_reach_the_player() {
        let bridge = initialized().await;

        let result = bridge.call("seekTo", &json!({"playerId": "p1", "seconds": 4})).await;

        assert!(
            matches!(result, Err(BridgeError::MissingParameter(name)) if name == "allowSeekAhead")
        );
        assert!(bridge.backend().calls("p1").is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn missing_player_id_is_reported() {
        let bridge = initialized().await;

        let result = bridge.call("playVideo", &json!({})).await;

        assert!(matches!(result, Err(BridgeError::MissingParameter(name)) if name == "playerId"));
    }

    #[test_log::test(tokio::test)]
    async fn unknown_methods_are_rejected() {
        let bridge = initialized().await;

        let result = bridge.call("getIframe", &json!({"playerId": "p1"})).await;

        assert!(matches!(result, Err(BridgeError::UnknownMethod(name)) if name == "getIframe"));
    }

    #[test_log::test(tokio::test)]
    async fn set_volume_clamps_and_reports_the_applied_volume() {
        let bridge = initialized().await;

        let set = bridge
            .call("setVolume", &json!({"playerId": "p1", "volume": 150}))
            .await
            .unwrap();
        let get = bridge
            .call("getVolume", &json!({"playerId": "p1"}))
            .await
            .unwrap();

        assert_eq!(set, json!({"result": {"method": "setVolume", "value": 100}}));
        assert_eq!(get, json!({"result": {"method": "getVolume", "value": 100}}));
    }

    #[test_log::test(tokio::test)]
    async fn plugin_version_is_the_crate_version() {
        let bridge = PlayerBridge::new(EchoBackend::new());

        let response = bridge.call("getPluginVersion", &json!({})).await.unwrap();

        assert_eq!(response, json!({"version": PLUGIN_VERSION}));
    }

    #[test_log::test(tokio::test)]
    async fn all_players_events_state_is_wrapped_in_a_result() {
        let bridge = initialized().await;

        let response = bridge
            .call("getAllPlayersEventsState", &json!({}))
            .await
            .unwrap();

        assert_eq!(
            response,
            json!({"result": {
                "method": "getAllPlayersEventsState",
                "value": {"p1": {"events": {"onReady": null}}},
            }})
        );
    }

    #[test_log::test]
    fn unknown_event_names_are_rejected() {
        assert!(matches!(
            parse_event("onVolumeChange"),
            Err(BridgeError::UnknownEvent(name)) if name == "onVolumeChange"
        ));
        assert_eq!(parse_event("onError").unwrap(), PlayerEventKind::OnError);
    }

    #[test_log::test]
    fn errors_render_their_message() {
        assert_eq!(
            error_value(&BridgeError::NotReady("p1".into())),
            json!({"error": "Player 'p1' is not ready"})
        );
    }
}
