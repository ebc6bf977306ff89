//! In-memory player that behaves like the upstream one.
//!
//! Every command is recorded so callers can assert what reached the
//! "underlying" player. Callbacks the real player would raise on its own
//! (`onReady`, `onError`, external state changes) are triggered explicitly
//! with the `fire_*` methods.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::{Value, json};
use youtube_player_models::{
    CommandResult, PlaybackQuality, PlayerErrorCode, PlayerEventData, PlayerOptions, PlayerSize,
    PlayerState, PlaylistOptions,
};

use crate::{
    backend::{BackendError, EventSink, PlayerBackend, PlayerInstance},
    command::{Command, DEFAULT_PLAYBACK_RATE, DEFAULT_VOLUME},
};

pub const AVAILABLE_PLAYBACK_RATES: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

pub const AVAILABLE_QUALITY_LEVELS: [PlaybackQuality; 6] = [
    PlaybackQuality::HighRes,
    PlaybackQuality::Hd1080,
    PlaybackQuality::Hd720,
    PlaybackQuality::Large,
    PlaybackQuality::Medium,
    PlaybackQuality::Small,
];

#[derive(Debug, Default)]
struct Shared {
    sinks: BTreeMap<String, EventSink>,
    created: Vec<String>,
    released: Vec<String>,
    calls: BTreeMap<String, Vec<Command>>,
    failures: BTreeMap<(String, String), String>,
    responses: BTreeMap<(String, String), Value>,
    release_failures: BTreeMap<String, String>,
    create_failures: BTreeMap<String, String>,
}

/// Backend whose players live entirely in memory.
///
/// Cloning shares the recorded state.
#[derive(Debug, Clone, Default)]
pub struct EchoBackend {
    shared: Arc<Mutex<Shared>>,
    auto_ready: bool,
}

impl EchoBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Players fire `onReady` as soon as they are created.
    #[must_use]
    pub const fn with_auto_ready(mut self) -> Self {
        self.auto_ready = true;
        self
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sink of the most recently created player with this id.
    #[must_use]
    pub fn sink(&self, player_id: &str) -> Option<EventSink> {
        self.shared().sinks.get(player_id).cloned()
    }

    /// Raises `data` from the current player with this id.
    ///
    /// Returns `false` if no such player was created.
    pub fn fire(&self, player_id: &str, data: PlayerEventData) -> bool {
        self.sink(player_id).is_some_and(|sink| sink.emit(data))
    }

    pub fn fire_ready(&self, player_id: &str) -> bool {
        self.fire(player_id, PlayerEventData::Ready)
    }

    pub fn fire_error(&self, player_id: &str, code: PlayerErrorCode) -> bool {
        self.fire(player_id, PlayerEventData::Error(code))
    }

    pub fn fire_state(&self, player_id: &str, state: PlayerState) -> bool {
        self.fire(player_id, PlayerEventData::StateChange(state))
    }

    /// Ids passed to `create`, in order.
    #[must_use]
    pub fn created(&self) -> Vec<String> {
        self.shared().created.clone()
    }

    /// Ids of released players, in order.
    #[must_use]
    pub fn released(&self) -> Vec<String> {
        self.shared().released.clone()
    }

    /// Commands that reached players with this id.
    #[must_use]
    pub fn calls(&self, player_id: &str) -> Vec<Command> {
        self.shared()
            .calls
            .get(player_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next `method` call on `player_id` fail with `message`.
    pub fn fail_next(&self, player_id: &str, method: &str, message: &str) {
        self.shared().failures.insert(
            (player_id.to_string(), method.to_string()),
            message.to_string(),
        );
    }

    /// Makes the next `method` call on `player_id` return `value` as-is.
    pub fn respond_next(&self, player_id: &str, method: &str, value: Value) {
        self.shared()
            .responses
            .insert((player_id.to_string(), method.to_string()), value);
    }

    /// Makes the next creation of `player_id` fail with `message`.
    pub fn fail_create(&self, player_id: &str, message: &str) {
        self.shared()
            .create_failures
            .insert(player_id.to_string(), message.to_string());
    }

    /// Makes releasing `player_id` fail with `message`.
    pub fn fail_release(&self, player_id: &str, message: &str) {
        self.shared()
            .release_failures
            .insert(player_id.to_string(), message.to_string());
    }
}

#[async_trait]
impl PlayerBackend for EchoBackend {
    type Instance = EchoInstance;

    async fn create(
        &self,
        options: &PlayerOptions,
        sink: EventSink,
    ) -> Result<Self::Instance, BackendError> {
        log::debug!("echo: create player_id={}", options.player_id);

        {
            let mut shared = self.shared();
            if let Some(message) = shared.create_failures.remove(&options.player_id) {
                return Err(BackendError::Underlying(message));
            }
            shared.created.push(options.player_id.clone());
            shared
                .sinks
                .insert(options.player_id.clone(), sink.clone());
        }

        if self.auto_ready {
            sink.emit(PlayerEventData::Ready);
        }

        Ok(EchoInstance {
            player_id: options.player_id.clone(),
            shared: self.shared.clone(),
            sink,
            player: Mutex::new(EchoPlayer::new(options)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct EchoPlayer {
    video_id: String,
    video_url: Option<String>,
    state: PlayerState,
    current_time: f64,
    volume: u8,
    muted: bool,
    rate: f64,
    quality: PlaybackQuality,
    size: PlayerSize,
    fullscreen: bool,
    loop_playlists: bool,
    shuffle_playlist: bool,
    playlist: Vec<String>,
    playlist_index: Option<usize>,
}

impl EchoPlayer {
    fn new(options: &PlayerOptions) -> Self {
        Self {
            video_id: options.video_id.clone(),
            video_url: None,
            state: PlayerState::Unstarted,
            current_time: 0.0,
            volume: DEFAULT_VOLUME,
            muted: false,
            rate: DEFAULT_PLAYBACK_RATE,
            quality: PlaybackQuality::Default,
            size: options.player_size,
            fullscreen: options.is_fullscreen(),
            loop_playlists: false,
            shuffle_playlist: false,
            playlist: vec![],
            playlist_index: None,
        }
    }

    fn load_playlist(&mut self, options: &PlaylistOptions) {
        self.playlist = options
            .playlist
            .clone()
            .or_else(|| options.list.clone().map(|x| vec![x]))
            .unwrap_or_default();
        self.current_time = options.start_seconds.unwrap_or_default();

        let index = options.index.unwrap_or_default() as usize;
        self.select(index);
    }

    fn select(&mut self, index: usize) {
        if let Some(video_id) = self.playlist.get(index) {
            self.video_id.clone_from(video_id);
            self.playlist_index = Some(index);
        }
    }

    fn step(&mut self, forward: bool) -> bool {
        let len = self.playlist.len();
        let Some(index) = self.playlist_index else {
            return false;
        };

        let next = if forward {
            if index + 1 < len {
                Some(index + 1)
            } else if self.loop_playlists {
                Some(0)
            } else {
                None
            }
        } else if index > 0 {
            Some(index - 1)
        } else if self.loop_playlists {
            len.checked_sub(1)
        } else {
            None
        };

        next.is_some_and(|next| {
            self.select(next);
            self.current_time = 0.0;
            true
        })
    }
}

/// A player created by [`EchoBackend`].
#[derive(Debug)]
pub struct EchoInstance {
    player_id: String,
    shared: Arc<Mutex<Shared>>,
    sink: EventSink,
    player: Mutex<EchoPlayer>,
}

impl EchoInstance {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, player: &mut EchoPlayer, state: PlayerState) {
        if player.state != state {
            player.state = state;
            self.sink.emit(PlayerEventData::StateChange(state));
        }
    }

    #[allow(clippy::too_many_lines)]
    fn apply(&self, command: &Command) -> Value {
        let mut player = self
            .player
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match command {
            Command::PlayVideo => {
                self.transition(&mut player, PlayerState::Playing);
                Value::Null
            }
            Command::PauseVideo => {
                self.transition(&mut player, PlayerState::Paused);
                Value::Null
            }
            Command::StopVideo => {
                player.current_time = 0.0;
                self.transition(&mut player, PlayerState::Unstarted);
                Value::Null
            }
            Command::SeekTo { seconds, .. } => {
                player.current_time = seconds.max(0.0);
                Value::Null
            }
            Command::LoadVideoById(options) | Command::CueVideoById(options) => {
                player.video_id.clone_from(&options.video_id);
                player.video_url = None;
                player.playlist.clear();
                player.playlist_index = None;
                player.current_time = options.start_seconds.unwrap_or_default();
                let state = if matches!(command, Command::LoadVideoById(_)) {
                    PlayerState::Playing
                } else {
                    PlayerState::Cued
                };
                self.transition(&mut player, state);
                Value::Null
            }
            Command::LoadVideoByUrl(options) | Command::CueVideoByUrl(options) => {
                player.video_url = Some(options.media_content_url.clone());
                player.playlist.clear();
                player.playlist_index = None;
                player.current_time = options.start_seconds.unwrap_or_default();
                let state = if matches!(command, Command::LoadVideoByUrl(_)) {
                    PlayerState::Playing
                } else {
                    PlayerState::Cued
                };
                self.transition(&mut player, state);
                Value::Null
            }
            Command::CuePlaylist(options) => {
                player.load_playlist(options);
                self.transition(&mut player, PlayerState::Cued);
                Value::Null
            }
            Command::LoadPlaylist(options) => {
                player.load_playlist(options);
                self.transition(&mut player, PlayerState::Playing);
                Value::Null
            }
            Command::NextVideo => {
                if player.step(true) {
                    self.transition(&mut player, PlayerState::Playing);
                }
                Value::Null
            }
            Command::PreviousVideo => {
                if player.step(false) {
                    self.transition(&mut player, PlayerState::Playing);
                }
                Value::Null
            }
            Command::PlayVideoAt { index } => {
                let index = *index as usize;
                if index < player.playlist.len() {
                    player.select(index);
                    player.current_time = 0.0;
                    self.transition(&mut player, PlayerState::Playing);
                }
                Value::Null
            }
            Command::Mute => {
                player.muted = true;
                Value::Null
            }
            Command::UnMute => {
                player.muted = false;
                Value::Null
            }
            Command::IsMuted => json!(player.muted),
            Command::SetVolume { volume } => {
                player.volume = *volume;
                Value::Null
            }
            Command::GetVolume => json!(player.volume),
            Command::SetSize { width, height } => {
                player.size = PlayerSize {
                    width: *width,
                    height: *height,
                };
                Value::Null
            }
            Command::GetPlaybackRate => json!(player.rate),
            Command::SetPlaybackRate { suggested_rate } => {
                // the upstream player snaps to the closest supported rate
                let rate = AVAILABLE_PLAYBACK_RATES
                    .iter()
                    .copied()
                    .min_by(|a, b| {
                        (a - suggested_rate)
                            .abs()
                            .total_cmp(&(b - suggested_rate).abs())
                    })
                    .unwrap_or(DEFAULT_PLAYBACK_RATE);
                if (player.rate - rate).abs() > f64::EPSILON {
                    player.rate = rate;
                    self.sink.emit(PlayerEventData::PlaybackRateChange(rate));
                }
                Value::Null
            }
            Command::GetAvailablePlaybackRates => json!(AVAILABLE_PLAYBACK_RATES),
            Command::SetLoop { loop_playlists } => {
                player.loop_playlists = *loop_playlists;
                Value::Null
            }
            Command::SetShuffle { shuffle_playlist } => {
                player.shuffle_playlist = *shuffle_playlist;
                Value::Null
            }
            Command::GetVideoLoadedFraction => {
                json!(if player.state == PlayerState::Unstarted { 0.0 } else { 1.0 })
            }
            Command::GetPlayerState => json!(player.state.code()),
            Command::GetCurrentTime => json!(player.current_time),
            Command::GetDuration => json!(0.0),
            Command::GetPlaybackQuality => json!(player.quality),
            Command::SetPlaybackQuality { suggested_quality } => {
                if player.quality != *suggested_quality {
                    player.quality = *suggested_quality;
                    self.sink.emit(PlayerEventData::PlaybackQualityChange(
                        suggested_quality.to_string(),
                    ));
                }
                Value::Null
            }
            Command::GetAvailableQualityLevels => json!(AVAILABLE_QUALITY_LEVELS),
            Command::GetVideoUrl => json!(player.video_url.clone().unwrap_or_else(|| {
                format!("https://www.youtube.com/watch?v={}", player.video_id)
            })),
            Command::GetVideoEmbedCode => json!(format!(
                r#"<iframe width="{}" height="{}" src="https://www.youtube.com/embed/{}" frameborder="0" allowfullscreen></iframe>"#,
                player.size.width, player.size.height, player.video_id
            )),
            Command::GetPlaylist => json!(player.playlist),
            Command::GetPlaylistIndex => json!(
                player
                    .playlist_index
                    .and_then(|x| i64::try_from(x).ok())
                    .unwrap_or(-1)
            ),
            Command::ToggleFullScreen { is_full_screen } => {
                player.fullscreen = is_full_screen.unwrap_or(!player.fullscreen);
                Value::Null
            }
        }
    }
}

#[async_trait]
impl PlayerInstance for EchoInstance {
    async fn call(&self, command: &Command) -> Result<CommandResult, BackendError> {
        let key = (self.player_id.clone(), command.name().to_string());

        let (failure, response) = {
            let mut shared = self.shared();
            shared
                .calls
                .entry(self.player_id.clone())
                .or_default()
                .push(command.clone());
            (shared.failures.remove(&key), shared.responses.remove(&key))
        };

        if let Some(error) = failure {
            return Ok(CommandResult::Failure(error));
        }
        if let Some(value) = response {
            return Ok(CommandResult::Success(value));
        }

        Ok(CommandResult::Success(self.apply(command)))
    }

    async fn release(&self) -> Result<(), BackendError> {
        log::debug!("echo: release player_id={}", self.player_id);

        let mut shared = self.shared();
        shared.released.push(self.player_id.clone());

        match shared.release_failures.remove(&self.player_id) {
            Some(message) => Err(BackendError::Underlying(message)),
            None => Ok(()),
        }
    }
}
