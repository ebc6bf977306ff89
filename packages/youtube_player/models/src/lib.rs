//! Shared types for the YouTube player bridge.
//!
//! These types mirror the shapes exchanged with the application frontend and
//! with the underlying player technology: player options, playback states,
//! quality levels, event payloads and the JSON result envelopes.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;

mod options;
mod response;

pub use options::*;
pub use response::*;

/// Playback state reported by the underlying player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PlayerState {
    /// The video has not started (-1)
    Unstarted,
    /// The video has ended (0)
    Ended,
    /// The video is playing (1)
    Playing,
    /// The video is paused (2)
    Paused,
    /// The video is buffering (3)
    Buffering,
    /// The video is cued and ready to play (5)
    Cued,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid player state: {0}")]
pub struct InvalidPlayerState(pub i64);

impl PlayerState {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }
}

impl From<PlayerState> for i64 {
    fn from(value: PlayerState) -> Self {
        value.code()
    }
}

impl TryFrom<i64> for PlayerState {
    type Error = InvalidPlayerState;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            -1 => Self::Unstarted,
            0 => Self::Ended,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Buffering,
            5 => Self::Cued,
            _ => return Err(InvalidPlayerState(value)),
        })
    }
}

/// Error codes emitted through `onError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum PlayerErrorCode {
    /// The request contained an invalid parameter value (2)
    InvalidParam,
    /// The content cannot be played in an HTML5 player (5)
    Html5Error,
    /// The requested video was not found (100)
    VideoNotFound,
    /// The owner does not allow embedded playback (101)
    EmbeddingNotAllowed,
    /// Same as [`Self::EmbeddingNotAllowed`], reported as 150
    EmbeddingNotAllowedDisguised,
    /// Any code the upstream player adds later
    Unknown(i64),
}

impl From<i64> for PlayerErrorCode {
    fn from(value: i64) -> Self {
        match value {
            2 => Self::InvalidParam,
            5 => Self::Html5Error,
            100 => Self::VideoNotFound,
            101 => Self::EmbeddingNotAllowed,
            150 => Self::EmbeddingNotAllowedDisguised,
            other => Self::Unknown(other),
        }
    }
}

impl From<PlayerErrorCode> for i64 {
    fn from(value: PlayerErrorCode) -> Self {
        match value {
            PlayerErrorCode::InvalidParam => 2,
            PlayerErrorCode::Html5Error => 5,
            PlayerErrorCode::VideoNotFound => 100,
            PlayerErrorCode::EmbeddingNotAllowed => 101,
            PlayerErrorCode::EmbeddingNotAllowedDisguised => 150,
            PlayerErrorCode::Unknown(code) => code,
        }
    }
}

/// Playback quality levels understood by the upstream player.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackQuality {
    Small,
    Medium,
    Large,
    Hd720,
    Hd1080,
    HighRes,
    #[default]
    Default,
}

impl std::fmt::Display for PlaybackQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Names of the events a caller can subscribe to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PlayerEventKind {
    OnReady,
    OnStateChange,
    OnPlaybackQualityChange,
    OnPlaybackRateChange,
    OnError,
    OnApiChange,
}

impl PlayerEventKind {
    pub const ALL: [Self; 6] = [
        Self::OnReady,
        Self::OnStateChange,
        Self::OnPlaybackQualityChange,
        Self::OnPlaybackRateChange,
        Self::OnError,
        Self::OnApiChange,
    ];
}

impl std::fmt::Display for PlayerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Typed payload of a player event.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventData {
    Ready,
    StateChange(PlayerState),
    PlaybackQualityChange(String),
    PlaybackRateChange(f64),
    Error(PlayerErrorCode),
    ApiChange,
}

#[derive(Debug, Error)]
pub enum EventDataError {
    #[error("Invalid data for {event}: {data}")]
    InvalidData { event: PlayerEventKind, data: Value },
    #[error(transparent)]
    State(#[from] InvalidPlayerState),
}

impl PlayerEventData {
    #[must_use]
    pub const fn kind(&self) -> PlayerEventKind {
        match self {
            Self::Ready => PlayerEventKind::OnReady,
            Self::StateChange(_) => PlayerEventKind::OnStateChange,
            Self::PlaybackQualityChange(_) => PlayerEventKind::OnPlaybackQualityChange,
            Self::PlaybackRateChange(_) => PlayerEventKind::OnPlaybackRateChange,
            Self::Error(_) => PlayerEventKind::OnError,
            Self::ApiChange => PlayerEventKind::OnApiChange,
        }
    }

    /// The `data` field as delivered to subscribers.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Ready | Self::ApiChange => Value::Null,
            Self::StateChange(state) => Value::from(state.code()),
            Self::PlaybackQualityChange(quality) => Value::from(quality.as_str()),
            Self::PlaybackRateChange(rate) => Value::from(*rate),
            Self::Error(code) => Value::from(i64::from(*code)),
        }
    }

    /// Builds a typed payload from an event name and its raw `data`.
    ///
    /// # Errors
    ///
    /// * If `data` does not have the shape the event carries
    pub fn from_raw(kind: PlayerEventKind, data: Value) -> Result<Self, EventDataError> {
        let invalid = |data: Value| EventDataError::InvalidData { event: kind, data };

        Ok(match kind {
            PlayerEventKind::OnReady => Self::Ready,
            PlayerEventKind::OnApiChange => Self::ApiChange,
            PlayerEventKind::OnStateChange => match data.as_i64() {
                Some(code) => Self::StateChange(PlayerState::try_from(code)?),
                None => return Err(invalid(data)),
            },
            PlayerEventKind::OnPlaybackQualityChange => match data {
                Value::String(quality) => Self::PlaybackQualityChange(quality),
                other => return Err(invalid(other)),
            },
            PlayerEventKind::OnPlaybackRateChange => match data.as_f64() {
                Some(rate) => Self::PlaybackRateChange(rate),
                None => return Err(invalid(data)),
            },
            PlayerEventKind::OnError => match data.as_i64() {
                Some(code) => Self::Error(code.into()),
                None => return Err(invalid(data)),
            },
        })
    }
}

/// An event raised by one player, scoped by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PlayerEventPayload", try_from = "PlayerEventPayload")]
pub struct PlayerEvent {
    pub player_id: String,
    pub data: PlayerEventData,
}

impl PlayerEvent {
    #[must_use]
    pub fn new(player_id: impl Into<String>, data: PlayerEventData) -> Self {
        Self {
            player_id: player_id.into(),
            data,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> PlayerEventKind {
        self.data.kind()
    }
}

/// Wire shape of [`PlayerEvent`]: `{playerId, event, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEventPayload {
    pub player_id: String,
    pub event: PlayerEventKind,
    #[serde(default)]
    pub data: Value,
}

impl From<PlayerEvent> for PlayerEventPayload {
    fn from(value: PlayerEvent) -> Self {
        Self {
            event: value.kind(),
            data: value.data.to_value(),
            player_id: value.player_id,
        }
    }
}

impl TryFrom<PlayerEventPayload> for PlayerEvent {
    type Error = EventDataError;

    fn try_from(value: PlayerEventPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            data: PlayerEventData::from_raw(value.event, value.data)?,
            player_id: value.player_id,
        })
    }
}

/// Last payload observed for each event of one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerEventsState {
    pub events: BTreeMap<PlayerEventKind, Value>,
}

impl PlayerEventsState {
    pub fn record(&mut self, data: &PlayerEventData) {
        self.events.insert(data.kind(), data.to_value());
    }
}
