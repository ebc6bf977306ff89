//! HTML document hosting one IFrame API player.

use serde_json::{Value, json};
use youtube_player_models::{PlayerEventKind, PlayerOptions};

use crate::escape::{js_literal, quote_js_string};

pub const IFRAME_API_URL: &str = "https://www.youtube.com/iframe_api";
pub const DEFAULT_HOST: &str = "https://www.youtube.com";
pub const PRIVACY_ENHANCED_HOST: &str = "https://www.youtube-nocookie.com";

/// Global object the dispatch scripts call into.
pub const BRIDGE_OBJECT: &str = "window.__youtubePlayerBridge";

/// Logs messages to the console; useful when previewing a document in a
/// browser.
pub const CONSOLE_MESSAGE_HANDLER: &str = "function (message) { console.log(message); }";

#[must_use]
pub const fn embed_host(options: &PlayerOptions) -> &'static str {
    if matches!(options.privacy_enhanced, Some(true)) {
        PRIVACY_ENHANCED_HOST
    } else {
        DEFAULT_HOST
    }
}

/// `YT.Player` constructor options, without the event callbacks.
#[must_use]
pub fn player_config(options: &PlayerOptions) -> Value {
    json!({
        "host": embed_host(options),
        "videoId": options.video_id,
        "width": options.player_size.width,
        "height": options.player_size.height,
        "playerVars": options.player_vars.clone().unwrap_or_default(),
    })
}

/// Renders the player document.
///
/// `message_handler` is a JavaScript expression evaluating to a function that
/// receives every outbound message as a JSON string; it is inserted verbatim
/// and must come from trusted configuration. Caller-provided option values are
/// only ever embedded as escaped literals.
#[must_use]
pub fn render_document(options: &PlayerOptions, message_handler: &str) -> String {
    let config = js_literal(&player_config(options));
    let player_id = quote_js_string(&options.player_id);
    let debug = options.is_debug();
    let events = PlayerEventKind::ALL
        .iter()
        .map(|kind| {
            let name = quote_js_string(kind.as_ref());
            format!(
                "{name}: function (e) {{ emit({name}, e && e.data !== undefined ? e.data : null); }}"
            )
        })
        .collect::<Vec<_>>()
        .join(",\n          ");

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
      html, body {{ margin: 0; padding: 0; height: 100%; overflow: hidden; background: #000; }}
      #player {{ width: 100%; height: 100%; }}
    </style>
  </head>
  <body>
    <div id="player"></div>
    <script>
      (function () {{
        var config = {config};
        var playerId = {player_id};
        var debug = {debug};
        var handler = {message_handler};
        var player = null;
        var fullscreen = false;

        var post = function (message) {{
          if (debug) {{ console.debug("youtube-player", message); }}
          handler(JSON.stringify(message));
        }};
        var emit = function (event, data) {{
          post({{ type: "event", playerId: playerId, event: event, data: data }});
        }};
        var toggleFullScreen = function (flag) {{
          var target = flag === null || flag === undefined ? !fullscreen : flag;
          var frame = player.getIframe();
          if (target && frame.requestFullscreen) {{
            frame.requestFullscreen();
          }} else if (!target && document.fullscreenElement) {{
            document.exitFullscreen();
          }}
          fullscreen = target;
          return target;
        }};

        window.onYouTubeIframeAPIReady = function () {{
          config.events = {{
          {events}
          }};
          player = new YT.Player("player", config);
        }};

        {BRIDGE_OBJECT} = {{
          dispatch: function (callId, method, args) {{
            var message = {{ type: "result", playerId: playerId, callId: callId }};
            try {{
              if (!player) {{ throw new Error("Player is not created yet"); }}
              var value = method === "toggleFullScreen"
                ? toggleFullScreen(args[0])
                : player[method].apply(player, args);
              message.success = true;
              message.value = value === undefined ? null : value;
            }} catch (e) {{
              message.success = false;
              message.error = String(e && e.message ? e.message : e);
            }}
            post(message);
          }}
        }};
      }})();
    </script>
    <script src="{IFRAME_API_URL}"></script>
  </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use youtube_player_models::{PlayerSize, PlayerVars};

    use super::*;

    fn options() -> PlayerOptions {
        PlayerOptions::new(
            "p1",
            "dQw4w9WgXcQ",
            PlayerSize {
                width: 640,
                height: 360,
            },
        )
    }

    #[test_log::test]
    fn privacy_enhanced_players_use_the_nocookie_host() {
        let mut options = options();
        assert_eq!(embed_host(&options), DEFAULT_HOST);

        options.privacy_enhanced = Some(true);
        assert_eq!(embed_host(&options), PRIVACY_ENHANCED_HOST);
        assert!(
            render_document(&options, CONSOLE_MESSAGE_HANDLER).contains("youtube-nocookie.com")
        );
    }

    #[test_log::test]
    fn config_carries_size_and_player_vars() {
        let mut options = options();
        options.player_vars = Some(PlayerVars {
            autoplay: Some(1),
            ..PlayerVars::default()
        });

        assert_eq!(
            player_config(&options),
            json!({
                "host": DEFAULT_HOST,
                "videoId": "dQw4w9WgXcQ",
                "width": 640,
                "height": 360,
                "playerVars": {"autoplay": 1},
            })
        );
    }

    #[test_log::test]
    fn document_loads_the_iframe_api_and_defines_the_bridge() {
        let document = render_document(&options(), CONSOLE_MESSAGE_HANDLER);

        assert!(document.contains(IFRAME_API_URL));
        assert!(document.contains("window.__youtubePlayerBridge = {"));
        assert!(document.contains(r#""onStateChange": function (e)"#));
        assert!(document.contains(CONSOLE_MESSAGE_HANDLER));
    }

    #[test_log::test]
    fn hostile_ids_stay_inside_string_literals() {
        let mut options = options();
        options.player_id = "</script><script>alert(1)</script>".to_string();
        options.video_id = "\"});alert(1);({\"".to_string();

        let document = render_document(&options, CONSOLE_MESSAGE_HANDLER);

        assert_eq!(document.matches("</script>").count(), 2);

        let (player_id, rest) = literal_after(&document, "var playerId = ");
        assert_eq!(player_id, options.player_id);
        assert!(rest.starts_with(";\n"));

        let (config, rest) = literal_after(&document, "var config = JSON.parse(");
        assert_eq!(
            serde_json::from_str::<Value>(&config).unwrap()["videoId"],
            options.video_id
        );
        assert!(rest.starts_with(");\n"));
    }

    fn literal_after<'a>(document: &'a str, prefix: &str) -> (String, &'a str) {
        let start = document.find(prefix).unwrap() + prefix.len();
        crate::escape::js::parse_string_literal(&document[start..]).unwrap()
    }
}
