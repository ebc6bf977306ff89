use youtube_player::Command;

use crate::{
    document::BRIDGE_OBJECT,
    escape::{js_literal, quote_js_string},
};

/// Builds the script that runs `command` inside a player document.
///
/// The page answers with a `result` message carrying `call_id`.
///
/// # Errors
///
/// * If the command arguments fail to serialize
pub fn dispatch_script(call_id: u64, command: &Command) -> Result<String, serde_json::Error> {
    let args = command
        .args()?
        .iter()
        .map(js_literal)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "{BRIDGE_OBJECT}.dispatch({call_id}, {}, [{args}]);",
        quote_js_string(command.name())
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn commands_without_arguments_pass_an_empty_list() {
        assert_eq!(
            dispatch_script(7, &Command::PlayVideo).unwrap(),
            r#"window.__youtubePlayerBridge.dispatch(7, "playVideo", []);"#
        );
    }

    #[test_log::test]
    fn scalar_arguments_keep_their_order() {
        let command = Command::SeekTo {
            seconds: 30.0,
            allow_seek_ahead: true,
        };

        assert_eq!(
            dispatch_script(1, &command).unwrap(),
            r#"window.__youtubePlayerBridge.dispatch(1, "seekTo", [30.0, true]);"#
        );
    }

    #[test_log::test]
    fn string_arguments_are_escaped() {
        let command = Command::SetPlaybackQuality {
            suggested_quality: youtube_player_models::PlaybackQuality::Hd720,
        };

        assert_eq!(
            dispatch_script(2, &command).unwrap(),
            r#"window.__youtubePlayerBridge.dispatch(2, "setPlaybackQuality", ["hd720"]);"#
        );
    }
}
