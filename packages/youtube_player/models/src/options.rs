use serde::{Deserialize, Serialize};

use crate::PlaybackQuality;

/// Player dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSize {
    pub width: u32,
    pub height: u32,
}

/// Options passed to `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    /// Caller-chosen identifier, unique across live players
    pub player_id: String,
    pub video_id: String,
    pub player_size: PlayerSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_vars: Option<PlayerVars>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    /// Use `youtube-nocookie.com` as the embed host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_enhanced: Option<bool>,
    /// `name=value; name2=value2` cookie header to seed the player's cookie store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
}

impl PlayerOptions {
    #[must_use]
    pub fn new(
        player_id: impl Into<String>,
        video_id: impl Into<String>,
        size: PlayerSize,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            video_id: video_id.into(),
            player_size: size,
            fullscreen: None,
            player_vars: None,
            debug: None,
            privacy_enhanced: None,
            cookies: None,
        }
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or_default()
    }

    #[must_use]
    pub fn is_privacy_enhanced(&self) -> bool {
        self.privacy_enhanced.unwrap_or_default()
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.unwrap_or_default()
    }
}

/// Upstream player parameters.
///
/// See <https://developers.google.com/youtube/player_parameters>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_load_policy: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disablekb: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enablejsapi: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv_load_policy: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default, rename = "listType", skip_serializing_if = "Option::is_none")]
    pub list_type: Option<String>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modestbranding: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playsinline: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showinfo: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

impl PlayerVars {
    /// Fills every parameter left unset with the one from `defaults`.
    pub fn fill_from(&mut self, defaults: &Self) {
        macro_rules! fill {
            ($target:ident, $source:ident; $($field:ident),+ $(,)?) => {
                $(
                    if $target.$field.is_none() {
                        $target.$field.clone_from(&$source.$field);
                    }
                )+
            };
        }

        fill!(
            self,
            defaults;
            autoplay,
            cc_load_policy,
            color,
            controls,
            disablekb,
            enablejsapi,
            end,
            fs,
            hl,
            iv_load_policy,
            list,
            list_type,
            loop_,
            modestbranding,
            origin,
            playlist,
            playsinline,
            rel,
            showinfo,
            start,
        );
    }
}

/// Kind of content a playlist request refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    Playlist,
    Search,
    UserUploads,
}

/// Options for `cuePlaylist` and `loadPlaylist`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistOptions {
    #[serde(default)]
    pub list_type: ListType,
    /// Playlist id, search query or user name depending on `list_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    /// Explicit video ids to play as a playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_quality: Option<PlaybackQuality>,
}

/// Options for `loadVideoById` and `cueVideoById`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOptionsById {
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_quality: Option<PlaybackQuality>,
}

/// Options for `loadVideoByUrl` and `cueVideoByUrl`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOptionsByUrl {
    pub media_content_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_quality: Option<PlaybackQuality>,
}
