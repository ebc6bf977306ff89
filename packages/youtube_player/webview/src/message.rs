//! Messages posted by a player document back to the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use youtube_player_models::{CommandResult, PlayerEventPayload};

/// One inbound message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeMessage {
    Result(CallResultMessage),
    Event(PlayerEventPayload),
}

/// Answer to one dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResultMessage {
    pub player_id: String,
    pub call_id: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResultMessage {
    /// A failure without message is reported as `"Unknown error"`.
    #[must_use]
    pub fn into_command_result(self) -> CommandResult {
        if self.success {
            CommandResult::Success(self.value.unwrap_or(Value::Null))
        } else {
            CommandResult::Failure(self.error.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

/// # Errors
///
/// * If `message` is not a well-formed bridge message
pub fn parse_message(message: &str) -> Result<BridgeMessage, serde_json::Error> {
    serde_json::from_str(message)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use youtube_player_models::PlayerEventKind;

    use super::*;

    #[test_log::test]
    fn parses_successful_results() {
        let message = parse_message(
            r#"{"type":"result","playerId":"p1","callId":3,"success":true,"value":42}"#,
        )
        .unwrap();

        let BridgeMessage::Result(result) = message else {
            panic!("expected a result, got {message:?}");
        };
        assert_eq!(result.call_id, 3);
        assert_eq!(
            result.into_command_result(),
            CommandResult::Success(json!(42))
        );
    }

    #[test_log::test]
    fn failed_results_keep_the_message() {
        let message = parse_message(
            r#"{"type":"result","playerId":"p1","callId":4,"success":false,"error":"boom"}"#,
        )
        .unwrap();

        let BridgeMessage::Result(result) = message else {
            panic!("expected a result, got {message:?}");
        };
        assert_eq!(
            result.into_command_result(),
            CommandResult::Failure("boom".to_string())
        );
    }

    #[test_log::test]
    fn successful_results_without_value_are_null() {
        let result = CallResultMessage {
            player_id: "p1".to_string(),
            call_id: 1,
            success: true,
            value: None,
            error: None,
        };

        assert_eq!(
            result.into_command_result(),
            CommandResult::Success(Value::Null)
        );
    }

    #[test_log::test]
    fn parses_events() {
        let message =
            parse_message(r#"{"type":"event","playerId":"p1","event":"onStateChange","data":1}"#)
                .unwrap();

        assert_eq!(
            message,
            BridgeMessage::Event(PlayerEventPayload {
                player_id: "p1".to_string(),
                event: PlayerEventKind::OnStateChange,
                data: json!(1),
            })
        );
    }

    #[test_log::test]
    fn rejects_unknown_message_types() {
        assert!(parse_message(r#"{"type":"hello","playerId":"p1"}"#).is_err());
        assert!(parse_message(r#"{"type":"event","playerId":"p1","event":"onBogus"}"#).is_err());
    }
}
