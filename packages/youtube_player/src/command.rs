//! Structured commands understood by every backend.
//!
//! A [`Command`] carries its name and typed arguments. Backends either invoke
//! the matching method directly or serialize [`Command::args`] for their
//! transport; nothing here builds script text.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use strum_macros::AsRefStr;
use youtube_player_models::{
    CallResponse, PlaybackQuality, PlayerState, PlaylistOptions, VideoOptionsById,
    VideoOptionsByUrl,
};

use crate::BridgeError;

pub const DEFAULT_VOLUME: u8 = 50;
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.0;
pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, Clone, PartialEq, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Command {
    PlayVideo,
    PauseVideo,
    StopVideo,
    SeekTo {
        seconds: f64,
        allow_seek_ahead: bool,
    },
    LoadVideoById(VideoOptionsById),
    CueVideoById(VideoOptionsById),
    LoadVideoByUrl(VideoOptionsByUrl),
    CueVideoByUrl(VideoOptionsByUrl),
    CuePlaylist(PlaylistOptions),
    LoadPlaylist(PlaylistOptions),
    NextVideo,
    PreviousVideo,
    PlayVideoAt {
        index: u32,
    },
    Mute,
    UnMute,
    IsMuted,
    SetVolume {
        volume: u8,
    },
    GetVolume,
    SetSize {
        width: u32,
        height: u32,
    },
    GetPlaybackRate,
    SetPlaybackRate {
        suggested_rate: f64,
    },
    GetAvailablePlaybackRates,
    SetLoop {
        loop_playlists: bool,
    },
    SetShuffle {
        shuffle_playlist: bool,
    },
    GetVideoLoadedFraction,
    GetPlayerState,
    GetCurrentTime,
    GetDuration,
    GetPlaybackQuality,
    SetPlaybackQuality {
        suggested_quality: PlaybackQuality,
    },
    GetAvailableQualityLevels,
    GetVideoUrl,
    GetVideoEmbedCode,
    GetPlaylist,
    GetPlaylistIndex,
    /// `None` flips the current fullscreen state
    ToggleFullScreen {
        is_full_screen: Option<bool>,
    },
}

/// Clamps a requested volume into `0..=100`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_volume(volume: f64) -> u8 {
    if volume.is_nan() {
        return 0;
    }

    volume.round().clamp(0.0, f64::from(MAX_VOLUME)) as u8
}

impl Command {
    /// Name of the upstream player method, e.g. `seekTo`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    #[must_use]
    pub fn set_volume(volume: f64) -> Self {
        Self::SetVolume {
            volume: clamp_volume(volume),
        }
    }

    /// Arguments in the order the upstream player API expects them.
    ///
    /// # Errors
    ///
    /// * If an options object fails to serialize
    pub fn args(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(match self {
            Self::SeekTo {
                seconds,
                allow_seek_ahead,
            } => vec![json!(seconds), json!(allow_seek_ahead)],
            Self::LoadVideoById(options) | Self::CueVideoById(options) => {
                vec![serde_json::to_value(options)?]
            }
            Self::LoadVideoByUrl(options) | Self::CueVideoByUrl(options) => {
                vec![serde_json::to_value(options)?]
            }
            Self::CuePlaylist(options) | Self::LoadPlaylist(options) => {
                if let Some(playlist) = &options.playlist {
                    // array form: (playlist, index, startSeconds, suggestedQuality)
                    vec![
                        serde_json::to_value(playlist)?,
                        json!(options.index.unwrap_or_default()),
                        json!(options.start_seconds.unwrap_or_default()),
                        serde_json::to_value(options.suggested_quality.unwrap_or_default())?,
                    ]
                } else {
                    vec![serde_json::to_value(options)?]
                }
            }
            Self::PlayVideoAt { index } => vec![json!(index)],
            Self::SetVolume { volume } => vec![json!(volume)],
            Self::SetSize { width, height } => vec![json!(width), json!(height)],
            Self::SetPlaybackRate { suggested_rate } => vec![json!(suggested_rate)],
            Self::SetLoop { loop_playlists } => vec![json!(loop_playlists)],
            Self::SetShuffle { shuffle_playlist } => vec![json!(shuffle_playlist)],
            Self::SetPlaybackQuality { suggested_quality } => {
                vec![serde_json::to_value(suggested_quality)?]
            }
            Self::ToggleFullScreen { is_full_screen } => vec![json!(is_full_screen)],
            Self::PlayVideo
            | Self::PauseVideo
            | Self::StopVideo
            | Self::NextVideo
            | Self::PreviousVideo
            | Self::Mute
            | Self::UnMute
            | Self::IsMuted
            | Self::GetVolume
            | Self::GetPlaybackRate
            | Self::GetAvailablePlaybackRates
            | Self::GetVideoLoadedFraction
            | Self::GetPlayerState
            | Self::GetCurrentTime
            | Self::GetDuration
            | Self::GetPlaybackQuality
            | Self::GetAvailableQualityLevels
            | Self::GetVideoUrl
            | Self::GetVideoEmbedCode
            | Self::GetPlaylist
            | Self::GetPlaylistIndex => vec![],
        })
    }

    /// Value substituted when a query returns a missing or mistyped value.
    ///
    /// `None` for commands that are not queries.
    #[must_use]
    pub const fn fallback(&self) -> Option<Fallback> {
        Some(match self {
            Self::GetVolume => Fallback::Number(DEFAULT_VOLUME as f64),
            Self::GetPlaybackRate => Fallback::Number(DEFAULT_PLAYBACK_RATE),
            Self::GetPlayerState => Fallback::Integer(PlayerState::Unstarted.code()),
            Self::GetPlaylistIndex => Fallback::Integer(-1),
            Self::GetVideoLoadedFraction | Self::GetCurrentTime | Self::GetDuration => {
                Fallback::Number(0.0)
            }
            Self::GetPlaybackQuality => Fallback::Text("default"),
            Self::GetVideoUrl | Self::GetVideoEmbedCode => Fallback::Text(""),
            Self::GetAvailablePlaybackRates
            | Self::GetAvailableQualityLevels
            | Self::GetPlaylist => Fallback::List,
            Self::IsMuted => Fallback::Bool(false),
            _ => return None,
        })
    }

    /// Builds the caller envelope from the underlying return value.
    ///
    /// Queries pass their (coerced) value through; everything else answers
    /// with `true` or the value that was applied, echoing parameters where the
    /// call surface does.
    #[must_use]
    pub fn response(&self, value: Value) -> CallResponse {
        if let Some(fallback) = self.fallback() {
            return CallResponse::new(self.name(), fallback.coerce(self.name(), value));
        }

        match self {
            Self::SeekTo {
                seconds,
                allow_seek_ahead,
            } => CallResponse::new(self.name(), true)
                .with_param("seconds", number_value(*seconds))
                .with_param("allowSeekAhead", *allow_seek_ahead),
            Self::LoadVideoById(options) | Self::CueVideoById(options) => {
                CallResponse::new(self.name(), true)
                    .with_param("options", serde_json::to_value(options).unwrap_or_default())
            }
            Self::LoadVideoByUrl(options) | Self::CueVideoByUrl(options) => {
                CallResponse::new(self.name(), true)
                    .with_param("options", serde_json::to_value(options).unwrap_or_default())
            }
            Self::SetVolume { volume } => CallResponse::new(self.name(), *volume),
            Self::SetSize { width, height } => {
                CallResponse::new(self.name(), json!({"width": width, "height": height}))
            }
            Self::ToggleFullScreen { is_full_screen } => {
                CallResponse::new(self.name(), json!(is_full_screen))
            }
            _ => CallResponse::new(self.name(), true),
        }
    }

    /// Parses a plugin call (`method` plus its JSON parameters).
    ///
    /// `initialize`, `destroy` and the plugin-level methods are not commands
    /// and are rejected here.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::UnknownMethod`] if `method` is not a player command
    /// * [`BridgeError::MissingParameter`] if a required parameter is absent
    /// * [`BridgeError::InvalidParameter`] if a parameter has the wrong type
    pub fn from_call(method: &str, params: &Value) -> Result<Self, BridgeError> {
        Ok(match method {
            "playVideo" => Self::PlayVideo,
            "pauseVideo" => Self::PauseVideo,
            "stopVideo" => Self::StopVideo,
            "seekTo" => Self::SeekTo {
                seconds: param(params, "seconds")?,
                allow_seek_ahead: param(params, "allowSeekAhead")?,
            },
            "loadVideoById" => Self::LoadVideoById(param(params, "options")?),
            "cueVideoById" => Self::CueVideoById(param(params, "options")?),
            "loadVideoByUrl" => Self::LoadVideoByUrl(param(params, "options")?),
            "cueVideoByUrl" => Self::CueVideoByUrl(param(params, "options")?),
            "cuePlaylist" => Self::CuePlaylist(param(params, "playlistOptions")?),
            "loadPlaylist" => Self::LoadPlaylist(param(params, "playlistOptions")?),
            "nextVideo" => Self::NextVideo,
            "previousVideo" => Self::PreviousVideo,
            "playVideoAt" => Self::PlayVideoAt {
                index: param(params, "index")?,
            },
            "mute" => Self::Mute,
            "unMute" => Self::UnMute,
            "isMuted" => Self::IsMuted,
            "setVolume" => Self::SetVolume {
                volume: clamp_volume(param(params, "volume")?),
            },
            "getVolume" => Self::GetVolume,
            "setSize" => Self::SetSize {
                width: param(params, "width")?,
                height: param(params, "height")?,
            },
            "getPlaybackRate" => Self::GetPlaybackRate,
            "setPlaybackRate" => Self::SetPlaybackRate {
                suggested_rate: param(params, "suggestedRate")?,
            },
            "getAvailablePlaybackRates" => Self::GetAvailablePlaybackRates,
            "setLoop" => Self::SetLoop {
                loop_playlists: param(params, "loopPlaylists")?,
            },
            "setShuffle" => Self::SetShuffle {
                shuffle_playlist: param(params, "shufflePlaylist")?,
            },
            "getVideoLoadedFraction" => Self::GetVideoLoadedFraction,
            "getPlayerState" => Self::GetPlayerState,
            "getCurrentTime" => Self::GetCurrentTime,
            "getDuration" => Self::GetDuration,
            "getPlaybackQuality" => Self::GetPlaybackQuality,
            "setPlaybackQuality" => Self::SetPlaybackQuality {
                suggested_quality: param(params, "suggestedQuality")?,
            },
            "getAvailableQualityLevels" => Self::GetAvailableQualityLevels,
            "getVideoUrl" => Self::GetVideoUrl,
            "getVideoEmbedCode" => Self::GetVideoEmbedCode,
            "getPlaylist" => Self::GetPlaylist,
            "getPlaylistIndex" => Self::GetPlaylistIndex,
            "toggleFullScreen" => Self::ToggleFullScreen {
                is_full_screen: optional_param(params, "isFullScreen")?,
            },
            _ => return Err(BridgeError::UnknownMethod(method.to_string())),
        })
    }
}

/// Expected shape of a query result and its default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    Number(f64),
    Integer(i64),
    Text(&'static str),
    Bool(bool),
    List,
}

impl Fallback {
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Number(number) => json!(number),
            Self::Integer(integer) => json!(integer),
            Self::Text(text) => json!(text),
            Self::Bool(flag) => json!(flag),
            Self::List => json!([]),
        }
    }

    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Number(_) => value.is_number(),
            Self::Integer(_) => value.is_i64(),
            Self::Text(_) => value.is_string(),
            Self::Bool(_) => value.is_boolean(),
            Self::List => value.is_array(),
        }
    }

    /// Returns `value` if it has the expected shape, the default otherwise.
    #[must_use]
    pub fn coerce(self, method: &str, value: Value) -> Value {
        if self.accepts(&value) {
            return value;
        }

        log::debug!("coerce: {method} returned {value}, substituting default");
        self.default_value()
    }
}

/// Whole numbers echo as integers, matching what the caller sent.
#[allow(clippy::cast_possible_truncation)]
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, BridgeError> {
    optional_param(params, name)?.ok_or_else(|| BridgeError::MissingParameter(name.to_string()))
}

fn optional_param<T: DeserializeOwned>(
    params: &Value,
    name: &str,
) -> Result<Option<T>, BridgeError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value).map(Some).map_err(|e| {
            BridgeError::InvalidParameter {
                name: name.to_string(),
                message: e.to_string(),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use youtube_player_models::ListType;

    use super::*;

    #[test_log::test]
    fn names_match_upstream_methods() {
        assert_eq!(Command::UnMute.name(), "unMute");
        assert_eq!(Command::PlayVideoAt { index: 0 }.name(), "playVideoAt");
        assert_eq!(
            Command::CueVideoByUrl(VideoOptionsByUrl::default()).name(),
            "cueVideoByUrl"
        );
        assert_eq!(Command::GetVideoEmbedCode.name(), "getVideoEmbedCode");
        assert_eq!(
            Command::ToggleFullScreen {
                is_full_screen: None
            }
            .name(),
            "toggleFullScreen"
        );
    }

    #[test_log::test]
    fn volume_is_clamped() {
        assert_eq!(clamp_volume(150.0), 100);
        assert_eq!(clamp_volume(-3.0), 0);
        assert_eq!(clamp_volume(42.4), 42);
        assert_eq!(clamp_volume(f64::NAN), 0);
        assert_eq!(Command::set_volume(150.0), Command::SetVolume { volume: 100 });
        assert_eq!(Command::set_volume(64.0), Command::SetVolume { volume: 64 });
    }

    #[test_log::test]
    fn seek_args_are_in_upstream_order() {
        let command = Command::SeekTo {
            seconds: 30.0,
            allow_seek_ahead: true,
        };

        assert_eq!(command.args().unwrap(), vec![json!(30.0), json!(true)]);
    }

    #[test_log::test]
    fn playlist_args_use_array_form_for_explicit_ids() {
        let command = Command::CuePlaylist(PlaylistOptions {
            list_type: ListType::Playlist,
            playlist: Some(vec!["a".into(), "b".into()]),
            index: Some(1),
            ..PlaylistOptions::default()
        });

        assert_eq!(
            command.args().unwrap(),
            vec![json!(["a", "b"]), json!(1), json!(0.0), json!("default")]
        );
    }

    #[test_log::test]
    fn playlist_args_use_object_form_for_lists() {
        let command = Command::LoadPlaylist(PlaylistOptions {
            list_type: ListType::Search,
            list: Some("cats".into()),
            ..PlaylistOptions::default()
        });

        assert_eq!(
            command.args().unwrap(),
            vec![json!({"listType": "search", "list": "cats"})]
        );
    }

    #[test_log::test]
    fn queries_fall_back_to_defaults() {
        let cases = [
            (Command::GetVolume, json!("loud"), json!(50.0)),
            (Command::GetPlaybackRate, Value::Null, json!(1.0)),
            (Command::GetPlayerState, json!("playing"), json!(-1)),
            (Command::GetPlaybackQuality, json!(720), json!("default")),
            (Command::GetAvailableQualityLevels, json!({}), json!([])),
            (Command::GetPlaylist, Value::Null, json!([])),
            (Command::IsMuted, json!(1), json!(false)),
            (Command::GetPlaylistIndex, json!(1.5), json!(-1)),
        ];

        for (command, returned, expected) in cases {
            assert_eq!(command.response(returned).value(), &expected, "{command:?}");
        }
    }

    #[test_log::test]
    fn well_typed_query_values_pass_through() {
        assert_eq!(Command::GetVolume.response(json!(30)).value(), &json!(30));
        assert_eq!(
            Command::GetAvailablePlaybackRates
                .response(json!([0.5, 1, 2]))
                .value(),
            &json!([0.5, 1, 2])
        );
    }

    #[test_log::test]
    fn fire_and_forget_commands_answer_true() {
        let response = Command::PlayVideo.response(Value::Null);

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"result": {"method": "playVideo", "value": true}})
        );
    }

    #[test_log::test]
    fn parameterized_commands_echo_their_parameters() {
        let seek = Command::SeekTo {
            seconds: 30.0,
            allow_seek_ahead: true,
        }
        .response(Value::Null);
        assert_eq!(
            serde_json::to_value(seek).unwrap(),
            json!({"result": {"method": "seekTo", "value": true, "seconds": 30, "allowSeekAhead": true}})
        );

        let size = Command::SetSize {
            width: 640,
            height: 360,
        }
        .response(Value::Null);
        assert_eq!(size.value(), &json!({"width": 640, "height": 360}));

        let toggle = Command::ToggleFullScreen {
            is_full_screen: None,
        }
        .response(Value::Null);
        assert_eq!(toggle.value(), &Value::Null);
    }

    #[test_log::test]
    fn from_call_reports_missing_parameters() {
        let result = Command::from_call("seekTo", &json!({"playerId": "p1", "seconds": 3}));

        assert!(matches!(
            result,
            Err(BridgeError::MissingParameter(name)) if name == "allowSeekAhead"
        ));
    }

    #[test_log::test]
    fn from_call_reports_mistyped_parameters() {
        let result = Command::from_call("playVideoAt", &json!({"index": "first"}));

        assert!(matches!(
            result,
            Err(BridgeError::InvalidParameter { name, .. }) if name == "index"
        ));
    }

    #[test_log::test]
    fn from_call_parses_typed_arguments() {
        assert_eq!(
            Command::from_call("setVolume", &json!({"volume": 150})).unwrap(),
            Command::SetVolume { volume: 100 }
        );
        assert_eq!(
            Command::from_call("setPlaybackQuality", &json!({"suggestedQuality": "hd1080"}))
                .unwrap(),
            Command::SetPlaybackQuality {
                suggested_quality: PlaybackQuality::Hd1080
            }
        );
        assert_eq!(
            Command::from_call("toggleFullScreen", &json!({"isFullScreen": null})).unwrap(),
            Command::ToggleFullScreen {
                is_full_screen: None
            }
        );
        assert_eq!(
            Command::from_call(
                "loadVideoById",
                &json!({"options": {"videoId": "abc", "startSeconds": 5}})
            )
            .unwrap(),
            Command::LoadVideoById(VideoOptionsById {
                video_id: "abc".into(),
                start_seconds: Some(5.0),
                ..VideoOptionsById::default()
            })
        );
    }

    #[test_log::test]
    fn from_call_rejects_unknown_methods() {
        assert!(matches!(
            Command::from_call("getIframe", &json!({})),
            Err(BridgeError::UnknownMethod(_))
        ));
    }
}
