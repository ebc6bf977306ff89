use std::{
    collections::BTreeMap,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use youtube_player_logging::debug_or_trace;
use youtube_player_models::{
    CallResponse, CommandResult, InitializeResponse, PlaybackQuality, PlayerEventData,
    PlayerEventKind, PlayerEventsState, PlayerOptions, PlaylistOptions, VideoOptionsById,
    VideoOptionsByUrl,
};

use crate::{
    BridgeError, EventListener,
    backend::{EventSink, PlayerBackend, PlayerInstance as _, RelayMessage},
    command::Command,
    registry::{PlayerHandle, PlayerRegistry},
    relay::EventRelay,
};

type Handle<B> = Arc<PlayerHandle<<B as PlayerBackend>::Instance>>;

/// Owns the live players of one plugin instance.
///
/// Structural changes (`initialize`/`destroy`) take the registry write lock;
/// command dispatch and event delivery only read it. Events reported by the
/// backends are queued and applied either by [`Self::start_event_loop`] or by
/// calling [`Self::process_pending_events`].
pub struct PlayerBridge<B: PlayerBackend> {
    backend: B,
    players: RwLock<PlayerRegistry<B::Instance>>,
    relay: EventRelay,
    next_generation: AtomicU64,
    sender: flume::Sender<RelayMessage>,
    receiver: flume::Receiver<RelayMessage>,
}

impl<B: PlayerBackend + std::fmt::Debug> std::fmt::Debug for PlayerBridge<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerBridge")
            .field("backend", &self.backend)
            .field("players", &self.read_players().ids())
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

macro_rules! player_commands {
    ($($name:ident => $command:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Forwards `", stringify!($command), "` to the player.")]
            ///
            /// # Errors
            ///
            /// * If the player is missing or not ready
            /// * If the underlying player fails the call
            pub async fn $name(&self, player_id: &str) -> Result<CallResponse, BridgeError> {
                self.execute(player_id, Command::$command).await
            }
        )+
    };
}

impl<B: PlayerBackend> PlayerBridge<B> {
    pub fn new(backend: B) -> Self {
        let (sender, receiver) = flume::unbounded();

        Self {
            backend,
            players: RwLock::new(PlayerRegistry::new()),
            relay: EventRelay::new(),
            next_generation: AtomicU64::new(1),
            sender,
            receiver,
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn read_players(&self) -> RwLockReadGuard<'_, PlayerRegistry<B::Instance>> {
        self.players.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_players(&self) -> RwLockWriteGuard<'_, PlayerRegistry<B::Instance>> {
        self.players.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_handle(&self, player_id: &str) -> Result<Handle<B>, BridgeError> {
        let handle = self.read_players().lookup(player_id)?;

        if handle.is_destroyed() {
            return Err(BridgeError::NotFound(player_id.to_string()));
        }

        Ok(handle)
    }

    /// Creates a player and registers it under `options.player_id`.
    ///
    /// The player starts out not ready; commands succeed once its `onReady`
    /// event has been relayed. The id is taken for the whole creation, and
    /// events the backend reports meanwhile are applied to the new player.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::MissingParameter`] if the player id or video id is empty
    /// * [`BridgeError::DuplicateId`] if a player with the same id is live or
    ///   still being created
    /// * [`BridgeError::NotFound`] if the player was destroyed before its
    ///   creation finished
    /// * If the backend fails to create the player
    pub async fn initialize(
        &self,
        options: PlayerOptions,
    ) -> Result<InitializeResponse, BridgeError> {
        if options.player_id.is_empty() {
            return Err(BridgeError::MissingParameter("playerId".to_string()));
        }
        if options.video_id.is_empty() {
            return Err(BridgeError::MissingParameter("videoId".to_string()));
        }

        let player_id = options.player_id.clone();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        log::debug!("initialize: player_id={player_id} generation={generation}");
        debug_or_trace!(
            ("initialize: video_id={}", options.video_id),
            ("initialize: options={options:?}")
        );

        let handle = Arc::new(PlayerHandle::new(
            player_id.clone(),
            generation,
            options.is_debug(),
        ));

        // registered before creation so events fired meanwhile find the handle
        self.write_players().register(handle.clone())?;

        let sink = EventSink::new(player_id.clone(), generation, self.sender.clone());
        let instance = match self.backend.create(&options, sink).await {
            Ok(instance) => instance,
            Err(e) => {
                log::debug!("initialize: player_id={player_id} failed to create: {e}");
                handle.mark_destroyed();
                self.write_players().unregister_generation(&player_id, generation);
                return Err(e.into());
            }
        };

        if let Err(instance) = handle.attach(instance) {
            log::error!("initialize: player_id={player_id} already had an instance");
            Self::release_instance(&player_id, &instance).await;
        }

        if handle.is_destroyed() {
            log::debug!("initialize: player_id={player_id} was destroyed while being created");
            if let Some(instance) = handle.claim_release() {
                Self::release_instance(&player_id, instance).await;
            }
            return Err(BridgeError::NotFound(player_id));
        }

        Ok(InitializeResponse {
            player_ready: handle.is_ready(),
            player: player_id,
        })
    }

    async fn release_instance(player_id: &str, instance: &B::Instance) {
        if let Err(e) = instance.release().await {
            log::error!("failed to release player_id={player_id}: {e}");
        }
    }

    /// Releases the player and removes it from the registry.
    ///
    /// Subscriptions for the player are dropped and late events from it are
    /// discarded. The registry entry is removed even when the underlying
    /// release fails; that failure is still reported.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::NotFound`] if no player has this id
    /// * [`BridgeError::UnderlyingFailure`] if the underlying release failed
    pub async fn destroy(&self, player_id: &str) -> Result<CallResponse, BridgeError> {
        let handle = self.live_handle(player_id)?;

        if !handle.mark_destroyed() {
            return Err(BridgeError::NotFound(player_id.to_string()));
        }

        log::debug!(
            "destroy: player_id={player_id} generation={}",
            handle.generation()
        );

        // a player still being created is released by its `initialize`
        let released = match handle.claim_release() {
            Some(instance) => instance.release().await,
            None => Ok(()),
        };

        self.write_players().unregister_generation(player_id, handle.generation());

        self.relay.clear_player(player_id);

        released?;

        Ok(CallResponse::new("destroy", true))
    }

    /// Releases every live player. Called when the plugin shuts down.
    pub async fn shutdown(&self) {
        let handles = self.write_players().drain();

        for handle in handles {
            if !handle.mark_destroyed() {
                continue;
            }
            log::debug!("shutdown: releasing player_id={}", handle.player_id());
            if let Some(instance) = handle.claim_release() {
                Self::release_instance(handle.player_id(), instance).await;
            }
            self.relay.clear_player(handle.player_id());
        }
    }

    #[must_use]
    pub fn player_ids(&self) -> Vec<String> {
        self.read_players().ids()
    }

    #[must_use]
    pub fn contains(&self, player_id: &str) -> bool {
        self.read_players().contains(player_id)
    }

    /// # Errors
    ///
    /// * [`BridgeError::NotFound`] if no player has this id
    pub fn is_ready(&self, player_id: &str) -> Result<bool, BridgeError> {
        Ok(self.live_handle(player_id)?.is_ready())
    }

    /// Forwards `command` to a ready player and wraps the result.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::NotFound`] if no player has this id
    /// * [`BridgeError::NotReady`] if the player has not fired `onReady` yet
    /// * [`BridgeError::UnderlyingFailure`] if the underlying call failed
    pub async fn execute(
        &self,
        player_id: &str,
        command: Command,
    ) -> Result<CallResponse, BridgeError> {
        let handle = self.live_handle(player_id)?;

        let Some(instance) = handle.instance().filter(|_| handle.is_ready()) else {
            log::debug!(
                "execute: player_id={player_id} not ready, rejecting {}",
                command.name()
            );
            return Err(BridgeError::NotReady(player_id.to_string()));
        };

        if handle.is_debug() {
            log::debug!("execute: player_id={player_id} command={command:?}");
        } else {
            log::trace!("execute: player_id={player_id} command={command:?}");
        }

        match instance.call(&command).await? {
            CommandResult::Success(value) => Ok(command.response(value)),
            CommandResult::Failure(error) => {
                log::debug!(
                    "execute: player_id={player_id} {} failed: {error}",
                    command.name()
                );
                Err(BridgeError::UnderlyingFailure(error))
            }
        }
    }

    player_commands!(
        play_video => PlayVideo,
        pause_video => PauseVideo,
        stop_video => StopVideo,
        next_video => NextVideo,
        previous_video => PreviousVideo,
        mute => Mute,
        un_mute => UnMute,
        is_muted => IsMuted,
        get_volume => GetVolume,
        get_playback_rate => GetPlaybackRate,
        get_available_playback_rates => GetAvailablePlaybackRates,
        get_video_loaded_fraction => GetVideoLoadedFraction,
        get_player_state => GetPlayerState,
        get_current_time => GetCurrentTime,
        get_duration => GetDuration,
        get_playback_quality => GetPlaybackQuality,
        get_available_quality_levels => GetAvailableQualityLevels,
        get_video_url => GetVideoUrl,
        get_video_embed_code => GetVideoEmbedCode,
        get_playlist => GetPlaylist,
        get_playlist_index => GetPlaylistIndex,
    );

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn seek_to(
        &self,
        player_id: &str,
        seconds: f64,
        allow_seek_ahead: bool,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(
            player_id,
            Command::SeekTo {
                seconds,
                allow_seek_ahead,
            },
        )
        .await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn load_video_by_id(
        &self,
        player_id: &str,
        options: VideoOptionsById,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::LoadVideoById(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn cue_video_by_id(
        &self,
        player_id: &str,
        options: VideoOptionsById,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::CueVideoById(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn load_video_by_url(
        &self,
        player_id: &str,
        options: VideoOptionsByUrl,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::LoadVideoByUrl(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn cue_video_by_url(
        &self,
        player_id: &str,
        options: VideoOptionsByUrl,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::CueVideoByUrl(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn cue_playlist(
        &self,
        player_id: &str,
        options: PlaylistOptions,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::CuePlaylist(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn load_playlist(
        &self,
        player_id: &str,
        options: PlaylistOptions,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::LoadPlaylist(options)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn play_video_at(
        &self,
        player_id: &str,
        index: u32,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::PlayVideoAt { index }).await
    }

    /// Sets the volume, clamped to `0..=100`.
    ///
    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_volume(
        &self,
        player_id: &str,
        volume: f64,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::set_volume(volume)).await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_size(
        &self,
        player_id: &str,
        width: u32,
        height: u32,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::SetSize { width, height })
            .await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_playback_rate(
        &self,
        player_id: &str,
        suggested_rate: f64,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::SetPlaybackRate { suggested_rate })
            .await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_loop(
        &self,
        player_id: &str,
        loop_playlists: bool,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::SetLoop { loop_playlists })
            .await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_shuffle(
        &self,
        player_id: &str,
        shuffle_playlist: bool,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::SetShuffle { shuffle_playlist })
            .await
    }

    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn set_playback_quality(
        &self,
        player_id: &str,
        suggested_quality: PlaybackQuality,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::SetPlaybackQuality { suggested_quality })
            .await
    }

    /// Enters (`Some(true)`), leaves (`Some(false)`) or toggles (`None`)
    /// fullscreen.
    ///
    /// # Errors
    ///
    /// * If the player is missing or not ready, or the call fails
    pub async fn toggle_full_screen(
        &self,
        player_id: &str,
        is_full_screen: Option<bool>,
    ) -> Result<CallResponse, BridgeError> {
        self.execute(player_id, Command::ToggleFullScreen { is_full_screen })
            .await
    }

    /// Last payload of each event, per live player.
    #[must_use]
    pub fn all_players_events_state(&self) -> BTreeMap<String, PlayerEventsState> {
        self.read_players()
            .handles()
            .map(|x| (x.player_id().to_string(), x.events_state()))
            .collect()
    }

    /// Subscribes `listener` to `event` of `player_id`.
    ///
    /// The player does not need to exist yet.
    pub fn add_event_listener(
        &self,
        player_id: &str,
        event: PlayerEventKind,
        listener: EventListener,
    ) {
        self.relay.subscribe(player_id, event, listener);
    }

    /// Returns `false` if `listener` was not subscribed.
    pub fn remove_event_listener(
        &self,
        player_id: &str,
        event: PlayerEventKind,
        listener: &EventListener,
    ) -> bool {
        self.relay.unsubscribe(player_id, event, listener)
    }

    fn apply(&self, message: RelayMessage) {
        let RelayMessage { generation, event } = message;

        let Ok(handle) = self.read_players().lookup(&event.player_id) else {
            log::debug!(
                "apply: dropping {} for unknown player_id={}",
                event.kind(),
                event.player_id
            );
            return;
        };

        if handle.generation() != generation || handle.is_destroyed() {
            log::debug!(
                "apply: dropping stale {} for player_id={} generation={generation}",
                event.kind(),
                event.player_id
            );
            return;
        }

        if matches!(event.data, PlayerEventData::Ready) {
            handle.mark_ready();
        }
        handle.record_event(&event.data);

        if handle.is_debug() {
            log::debug!("apply: {event:?}");
        } else {
            log::trace!("apply: {event:?}");
        }

        self.relay.dispatch(&event);
    }

    /// Applies every queued event on the calling thread.
    ///
    /// Returns how many events were taken off the queue.
    pub fn process_pending_events(&self) -> usize {
        let mut count = 0;

        while let Ok(message) = self.receiver.try_recv() {
            self.apply(message);
            count += 1;
        }

        count
    }

    /// Applies queued events on a spawned task until `token` is cancelled or
    /// the bridge is dropped.
    pub fn start_event_loop(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let bridge = Arc::downgrade(self);
        let receiver = self.receiver.clone();

        tokio::spawn(async move {
            log::debug!("event loop: started");

            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        log::debug!("event loop: cancelled");
                        break;
                    }
                    message = receiver.recv_async() => {
                        let Ok(message) = message else {
                            break;
                        };
                        let Some(bridge) = bridge.upgrade() else {
                            log::debug!("event loop: bridge dropped");
                            break;
                        };
                        bridge.apply(message);
                    }
                }
            }

            log::debug!("event loop: stopped");
        })
    }
}

#[cfg(all(test, feature = "echo"))]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use youtube_player_models::{PlayerEvent, PlayerSize, PlayerState};

    use super::*;
    use crate::{BackendError, PlayerInstance, backends::echo::EchoBackend};

    /// Fires `onReady` from inside `create`, then waits for the gate before
    /// handing out the instance.
    struct GatedBackend {
        started: flume::Sender<()>,
        gate: flume::Receiver<()>,
        created: AtomicU64,
        released: Arc<AtomicU64>,
    }

    struct GatedInstance {
        released: Arc<AtomicU64>,
    }

    #[async_trait]
    impl PlayerBackend for GatedBackend {
        type Instance = GatedInstance;

        async fn create(
            &self,
            _options: &PlayerOptions,
            sink: EventSink,
        ) -> Result<Self::Instance, BackendError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            sink.emit(PlayerEventData::Ready);
            self.started.send(()).unwrap();
            self.gate.recv_async().await.unwrap();

            Ok(GatedInstance {
                released: self.released.clone(),
            })
        }
    }

    #[async_trait]
    impl PlayerInstance for GatedInstance {
        async fn call(&self, _command: &Command) -> Result<CommandResult, BackendError> {
            Ok(CommandResult::Success(Value::Null))
        }

        async fn release(&self) -> Result<(), BackendError> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn gated_bridge() -> (
        PlayerBridge<GatedBackend>,
        flume::Receiver<()>,
        flume::Sender<()>,
    ) {
        let (started, started_rx) = flume::unbounded();
        let (gate_tx, gate) = flume::unbounded();
        let backend = GatedBackend {
            started,
            gate,
            created: AtomicU64::new(0),
            released: Arc::new(AtomicU64::new(0)),
        };

        (PlayerBridge::new(backend), started_rx, gate_tx)
    }

    fn options(id: &str) -> PlayerOptions {
        PlayerOptions::new(
            id,
            "dQw4w9WgXcQ",
            PlayerSize {
                width: 640,
                height: 360,
            },
        )
    }

    async fn ready_bridge(id: &str) -> PlayerBridge<EchoBackend> {
        let bridge = PlayerBridge::new(EchoBackend::new());
        bridge.initialize(options(id)).await.unwrap();
        bridge.backend().fire_ready(id);
        bridge.process_pending_events();
        bridge
    }

    #[test_log::test(tokio::test)]
    async fn initialize_reports_not_ready_until_on_ready() {
        let bridge = PlayerBridge::new(EchoBackend::new());

        let response = bridge.initialize(options("p1")).await.unwrap();

        assert_eq!(
            response,
            InitializeResponse {
                player_ready: false,
                player: "p1".to_string(),
            }
        );
        assert!(!bridge.is_ready("p1").unwrap());

        bridge.backend().fire_ready("p1");
        assert_eq!(bridge.process_pending_events(), 1);
        assert!(bridge.is_ready("p1").unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn empty_ids_are_missing_parameters() {
        let bridge = PlayerBridge::new(EchoBackend::new());

        let result = bridge.initialize(options("")).await;

        assert!(matches!(result, Err(BridgeError::MissingParameter(name)) if name == "playerId"));
        assert!(bridge.backend().created().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn duplicate_initialize_is_rejected_without_creating() {
        let bridge = ready_bridge("p1").await;

        let result = bridge.initialize(options("p1")).await;

        assert!(matches!(result, Err(BridgeError::DuplicateId(id)) if id == "p1"));
        assert_eq!(bridge.backend().created(), vec!["p1".to_string()]);
        assert!(bridge.is_ready("p1").unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn commands_before_ready_are_never_forwarded() {
        let bridge = PlayerBridge::new(EchoBackend::new());
        bridge.initialize(options("p1")).await.unwrap();

        let result = bridge.play_video("p1").await;

        assert!(matches!(result, Err(BridgeError::NotReady(id)) if id == "p1"));
        assert!(bridge.backend().calls("p1").is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn underlying_failures_are_passed_through_verbatim() {
        let bridge = ready_bridge("p1").await;
        bridge
            .backend()
            .fail_next("p1", "playVideo", "Video unavailable: 100");

        let result = bridge.play_video("p1").await;

        assert!(
            matches!(result, Err(BridgeError::UnderlyingFailure(message)) if message == "Video unavailable: 100")
        );
    }

    #[test_log::test(tokio::test)]
    async fn malformed_query_results_use_fallbacks() {
        let bridge = ready_bridge("p1").await;
        bridge
            .backend()
            .respond_next("p1", "getPlayerState", json!("weird"));

        let response = bridge.get_player_state("p1").await.unwrap();

        assert_eq!(response.value(), &json!(-1));
    }

    #[test_log::test(tokio::test)]
    async fn destroy_releases_then_unregisters() {
        let bridge = ready_bridge("p1").await;

        let response = bridge.destroy("p1").await.unwrap();

        assert_eq!(response, CallResponse::new("destroy", true));
        assert_eq!(bridge.backend().released(), vec!["p1".to_string()]);
        assert!(!bridge.contains("p1"));
        assert!(matches!(
            bridge.destroy("p1").await,
            Err(BridgeError::NotFound(id)) if id == "p1"
        ));
    }

    #[test_log::test(tokio::test)]
    async fn failed_release_still_removes_the_player() {
        let bridge = ready_bridge("p1").await;
        bridge.backend().fail_release("p1", "surface already gone");

        let result = bridge.destroy("p1").await;

        assert!(matches!(
            result,
            Err(BridgeError::UnderlyingFailure(message)) if message == "surface already gone"
        ));
        assert!(!bridge.contains("p1"));
    }

    #[test_log::test(tokio::test)]
    async fn late_events_from_a_previous_generation_are_dropped() {
        let bridge = PlayerBridge::new(EchoBackend::new());
        bridge.initialize(options("p1")).await.unwrap();
        let stale = bridge.backend().sink("p1").unwrap();
        bridge.destroy("p1").await.unwrap();
        bridge.initialize(options("p1")).await.unwrap();

        stale.emit(PlayerEventData::Ready);
        bridge.process_pending_events();

        assert!(!bridge.is_ready("p1").unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn destroy_drops_subscriptions() {
        let bridge = ready_bridge("p1").await;
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        bridge.add_event_listener(
            "p1",
            PlayerEventKind::OnStateChange,
            Arc::new(move |_: &PlayerEvent| *counter.lock().unwrap() += 1),
        );

        bridge.destroy("p1").await.unwrap();
        bridge.initialize(options("p1")).await.unwrap();
        bridge.backend().fire_ready("p1");
        bridge.process_pending_events();
        bridge.play_video("p1").await.unwrap();
        bridge.process_pending_events();

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn events_state_tracks_last_payloads() {
        let bridge = ready_bridge("p1").await;
        bridge.play_video("p1").await.unwrap();
        bridge.backend().fire_state("p1", PlayerState::Paused);
        bridge.process_pending_events();

        let state = bridge.all_players_events_state();

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"p1": {"events": {"onReady": null, "onStateChange": 2}}})
        );
    }

    #[test_log::test(tokio::test)]
    async fn shutdown_releases_every_player() {
        let bridge = ready_bridge("p1").await;
        bridge.initialize(options("p2")).await.unwrap();

        bridge.shutdown().await;

        assert!(bridge.player_ids().is_empty());
        assert_eq!(
            bridge.backend().released(),
            vec!["p1".to_string(), "p2".to_string()]
        );
    }

    #[test_log::test(tokio::test)]
    async fn event_loop_applies_events_until_cancelled() {
        let bridge = Arc::new(PlayerBridge::new(EchoBackend::new()));
        let token = CancellationToken::new();
        let (tx, rx) = flume::unbounded();
        bridge.add_event_listener(
            "p1",
            PlayerEventKind::OnReady,
            Arc::new(move |event: &PlayerEvent| {
                let _ = tx.send(event.player_id.clone());
            }),
        );
        let handle = bridge.start_event_loop(token.clone());

        bridge.initialize(options("p1")).await.unwrap();
        bridge.backend().fire_ready("p1");

        let delivered = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, "p1");
        assert!(bridge.is_ready("p1").unwrap());

        token.cancel();
        handle.await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn on_ready_fired_during_creation_is_kept() {
        let (bridge, started, gate) = gated_bridge();

        let (response, applied) = tokio::join!(bridge.initialize(options("p1")), async {
            started.recv_async().await.unwrap();
            let applied = bridge.process_pending_events();
            assert!(!bridge.is_ready("p1").unwrap());
            assert!(matches!(
                bridge.play_video("p1").await,
                Err(BridgeError::NotReady(id)) if id == "p1"
            ));
            gate.send(()).unwrap();
            applied
        });

        assert_eq!(applied, 1);
        assert!(response.unwrap().player_ready);
        assert!(bridge.is_ready("p1").unwrap());
        bridge.play_video("p1").await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_initialize_creates_the_player_once() {
        let (bridge, started, gate) = gated_bridge();

        let (first, second) = tokio::join!(bridge.initialize(options("p1")), async {
            started.recv_async().await.unwrap();
            let second = bridge.initialize(options("p1")).await;
            gate.send(()).unwrap();
            second
        });

        first.unwrap();
        assert!(matches!(second, Err(BridgeError::DuplicateId(id)) if id == "p1"));
        assert_eq!(bridge.backend().created.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.backend().released.load(Ordering::SeqCst), 0);
        assert!(bridge.contains("p1"));
    }

    #[test_log::test(tokio::test)]
    async fn destroy_during_creation_releases_the_instance_once() {
        let (bridge, started, gate) = gated_bridge();

        let (initialized, destroyed) = tokio::join!(bridge.initialize(options("p1")), async {
            started.recv_async().await.unwrap();
            let destroyed = bridge.destroy("p1").await;
            gate.send(()).unwrap();
            destroyed
        });

        destroyed.unwrap();
        assert!(matches!(initialized, Err(BridgeError::NotFound(id)) if id == "p1"));
        assert_eq!(bridge.backend().released.load(Ordering::SeqCst), 1);
        assert!(!bridge.contains("p1"));
    }

    #[test_log::test(tokio::test)]
    async fn failed_creation_frees_the_id() {
        let bridge = PlayerBridge::new(EchoBackend::new());
        bridge.backend().fail_create("p1", "embedding disabled");

        let result = bridge.initialize(options("p1")).await;

        assert!(matches!(
            result,
            Err(BridgeError::UnderlyingFailure(message)) if message == "embedding disabled"
        ));
        assert!(!bridge.contains("p1"));
        bridge.initialize(options("p1")).await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn shutdown_during_creation_releases_the_instance() {
        let (bridge, started, gate) = gated_bridge();

        let (initialized, ()) = tokio::join!(bridge.initialize(options("p1")), async {
            started.recv_async().await.unwrap();
            bridge.shutdown().await;
            gate.send(()).unwrap();
        });

        assert!(matches!(initialized, Err(BridgeError::NotFound(id)) if id == "p1"));
        assert_eq!(bridge.backend().released.load(Ordering::SeqCst), 1);
        assert!(bridge.player_ids().is_empty());
    }
}
