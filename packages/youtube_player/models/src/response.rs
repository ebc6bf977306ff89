use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Outcome of one command forwarded to an underlying player.
///
/// On the wire this is `{success: true, value}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawCommandResult", try_from = "RawCommandResult")]
pub enum CommandResult {
    Success(Value),
    Failure(String),
}

#[derive(Debug, Error)]
pub enum InvalidCommandResult {
    #[error("Failed command result is missing its error message")]
    MissingError,
    #[error("Successful command result carries an error: {0}")]
    UnexpectedError(String),
}

#[derive(Serialize, Deserialize)]
struct RawCommandResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<CommandResult> for RawCommandResult {
    fn from(value: CommandResult) -> Self {
        match value {
            CommandResult::Success(value) => Self {
                success: true,
                value: Some(value),
                error: None,
            },
            CommandResult::Failure(error) => Self {
                success: false,
                value: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<RawCommandResult> for CommandResult {
    type Error = InvalidCommandResult;

    fn try_from(value: RawCommandResult) -> Result<Self, Self::Error> {
        match (value.success, value.error) {
            // `undefined` return values are dropped by `JSON.stringify`
            (true, None) => Ok(Self::Success(value.value.unwrap_or(Value::Null))),
            (true, Some(error)) => Err(InvalidCommandResult::UnexpectedError(error)),
            (false, Some(error)) => Ok(Self::Failure(error)),
            (false, None) => Err(InvalidCommandResult::MissingError),
        }
    }
}

/// `{result: {method, value, ...params}}` envelope returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub result: MethodResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: String,
    pub value: Value,
    /// Request parameters echoed back for parameterized commands
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CallResponse {
    #[must_use]
    pub fn new(method: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            result: MethodResult {
                method: method.into(),
                value: value.into(),
                params: Map::new(),
            },
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.result.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.result.method
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.result.value
    }
}

/// Response to `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub player_ready: bool,
    pub player: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    pub version: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test_log::test]
    fn command_result_wire_shape() {
        assert_eq!(
            serde_json::to_value(CommandResult::Success(json!(42))).unwrap(),
            json!({"success": true, "value": 42})
        );
        assert_eq!(
            serde_json::to_value(CommandResult::Failure("boom".into())).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test_log::test]
    fn success_without_value_is_null() {
        let result: CommandResult = serde_json::from_value(json!({"success": true})).unwrap();

        assert_eq!(result, CommandResult::Success(Value::Null));
    }

    #[test_log::test]
    fn partially_populated_results_are_rejected() {
        assert!(serde_json::from_value::<CommandResult>(json!({"success": false})).is_err());
        assert!(
            serde_json::from_value::<CommandResult>(
                json!({"success": true, "value": 1, "error": "no"})
            )
            .is_err()
        );
    }

    #[test_log::test]
    fn call_response_flattens_echoed_params() {
        let response = CallResponse::new("seekTo", true)
            .with_param("seconds", 30)
            .with_param("allowSeekAhead", true);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"result": {"method": "seekTo", "value": true, "seconds": 30, "allowSeekAhead": true}})
        );
    }
}
