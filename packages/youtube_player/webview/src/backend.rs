//! [`PlayerBackend`] driving player documents through a [`ScriptHost`].

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use youtube_player::{BackendError, Command, EventSink, PlayerBackend, PlayerInstance};
use youtube_player_models::{CommandResult, PlayerEvent, PlayerOptions};

use crate::{
    HostError, ScriptHost, WebViewError,
    cookies::parse_cookie_header,
    document::render_document,
    message::{BridgeMessage, parse_message},
    script::dispatch_script,
};

impl From<HostError> for BackendError {
    fn from(value: HostError) -> Self {
        Self::Underlying(value.0)
    }
}

struct PendingCall {
    player_id: String,
    surface: u64,
    sender: flume::Sender<CommandResult>,
}

struct Surface {
    id: u64,
    sink: EventSink,
}

struct Shared<H> {
    host: H,
    message_handler: String,
    next_id: AtomicU64,
    pending: Mutex<BTreeMap<u64, PendingCall>>,
    surfaces: Mutex<BTreeMap<String, Surface>>,
}

impl<H> Shared<H> {
    fn pending(&self) -> MutexGuard<'_, BTreeMap<u64, PendingCall>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn surfaces(&self) -> MutexGuard<'_, BTreeMap<String, Surface>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn remove_surface(&self, player_id: &str, surface: u64) {
        let mut surfaces = self.surfaces();
        if surfaces.get(player_id).is_some_and(|x| x.id == surface) {
            surfaces.remove(player_id);
        }
    }
}

/// Runs every player in its own webview surface.
///
/// Results and events posted by the documents must be fed back through
/// [`Self::handle_message`]. Clones share the same surfaces and pending calls.
/// A player id stays taken until its surface finished closing.
pub struct WebViewBackend<H: ScriptHost> {
    shared: Arc<Shared<H>>,
}

impl<H: ScriptHost> Clone for WebViewBackend<H> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<H: ScriptHost> std::fmt::Debug for WebViewBackend<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebViewBackend")
            .field("surfaces", &self.shared.surfaces().keys().collect::<Vec<_>>())
            .field("pending", &self.shared.pending().len())
            .finish_non_exhaustive()
    }
}

impl<H: ScriptHost> WebViewBackend<H> {
    /// `message_handler` is the JavaScript function expression the documents
    /// post their messages to.
    pub fn new(host: H, message_handler: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                message_handler: message_handler.into(),
                next_id: AtomicU64::new(1),
                pending: Mutex::new(BTreeMap::new()),
                surfaces: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.shared.host
    }

    /// Number of dispatched calls still waiting for their result.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.shared.pending().len()
    }

    /// Routes one message posted by a player document.
    ///
    /// # Errors
    ///
    /// * If the message is malformed
    /// * [`WebViewError::UnknownCallId`] if a result answers no pending call
    ///   of that player
    /// * [`WebViewError::UnknownPlayer`] if an event comes from a player that
    ///   was released
    pub fn handle_message(&self, message: &str) -> Result<(), WebViewError> {
        self.route(parse_message(message)?)
    }

    /// Like [`Self::handle_message`], for a message posted by the surface of
    /// `player_id`.
    ///
    /// # Errors
    ///
    /// * [`WebViewError::UnknownPlayer`] if the message claims another player
    /// * Any error of [`Self::handle_message`]
    pub fn handle_message_from(&self, player_id: &str, message: &str) -> Result<(), WebViewError> {
        let message = parse_message(message)?;
        let claimed = match &message {
            BridgeMessage::Result(result) => &result.player_id,
            BridgeMessage::Event(event) => &event.player_id,
        };

        if claimed != player_id {
            log::warn!(
                "handle_message_from: surface of player_id={player_id} posted for {claimed}"
            );
            return Err(WebViewError::UnknownPlayer(claimed.clone()));
        }

        self.route(message)
    }

    fn route(&self, message: BridgeMessage) -> Result<(), WebViewError> {
        match message {
            BridgeMessage::Result(result) => {
                let call_id = result.call_id;
                let pending = {
                    let mut pending = self.shared.pending();
                    let owned = pending
                        .get(&call_id)
                        .is_some_and(|x| x.player_id == result.player_id);
                    if owned { pending.remove(&call_id) } else { None }
                };
                let Some(pending) = pending else {
                    log::debug!(
                        "handle_message: no pending call_id={call_id} for player_id={}",
                        result.player_id
                    );
                    return Err(WebViewError::UnknownCallId(call_id));
                };

                if pending.sender.send(result.into_command_result()).is_err() {
                    log::debug!("handle_message: caller of call_id={call_id} is gone");
                }
            }
            BridgeMessage::Event(payload) => {
                let sink = self
                    .shared
                    .surfaces()
                    .get(&payload.player_id)
                    .map(|x| x.sink.clone());
                let Some(sink) = sink else {
                    return Err(WebViewError::UnknownPlayer(payload.player_id));
                };

                let event = PlayerEvent::try_from(payload)?;
                sink.emit(event.data);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<H: ScriptHost> PlayerBackend for WebViewBackend<H> {
    type Instance = WebViewInstance<H>;

    async fn create(
        &self,
        options: &PlayerOptions,
        sink: EventSink,
    ) -> Result<Self::Instance, BackendError> {
        let player_id = options.player_id.clone();
        let surface = self.shared.next_id();

        // registered before the surface opens so early events are routed
        {
            let mut surfaces = self.shared.surfaces();
            if surfaces.contains_key(&player_id) {
                log::debug!("create: player_id={player_id} still has an open surface");
                return Err(BackendError::Underlying(format!(
                    "Player '{player_id}' still has an open surface"
                )));
            }
            surfaces.insert(player_id.clone(), Surface { id: surface, sink });
        }

        if let Some(header) = options.cookies.as_deref() {
            let cookies = parse_cookie_header(header);
            if !cookies.is_empty()
                && let Err(e) = self.shared.host.set_cookies(&player_id, &cookies).await
            {
                log::warn!("create: player_id={player_id} failed to set cookies: {e}");
            }
        }

        let document = render_document(options, &self.shared.message_handler);

        if let Err(e) = self.shared.host.open_surface(options, document).await {
            log::error!("create: player_id={player_id} failed to open surface: {e}");
            self.shared.remove_surface(&player_id, surface);
            return Err(e.into());
        }

        log::debug!("create: player_id={player_id} surface={surface}");

        Ok(WebViewInstance {
            shared: self.shared.clone(),
            player_id,
            surface,
        })
    }
}

/// One player document.
pub struct WebViewInstance<H: ScriptHost> {
    shared: Arc<Shared<H>>,
    player_id: String,
    surface: u64,
}

impl<H: ScriptHost> std::fmt::Debug for WebViewInstance<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebViewInstance")
            .field("player_id", &self.player_id)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<H: ScriptHost> PlayerInstance for WebViewInstance<H> {
    async fn call(&self, command: &Command) -> Result<CommandResult, BackendError> {
        let call_id = self.shared.next_id();
        let script = dispatch_script(call_id, command)?;
        let (sender, receiver) = flume::bounded(1);

        self.shared.pending().insert(
            call_id,
            PendingCall {
                player_id: self.player_id.clone(),
                surface: self.surface,
                sender,
            },
        );

        log::trace!("call: player_id={} script={script}", self.player_id);

        if let Err(e) = self.shared.host.evaluate(&self.player_id, &script).await {
            self.shared.pending().remove(&call_id);
            return Err(e.into());
        }

        receiver.recv_async().await.map_err(|_| {
            BackendError::Underlying(format!(
                "Player '{}' was released before answering {}",
                self.player_id,
                command.name()
            ))
        })
    }

    async fn release(&self) -> Result<(), BackendError> {
        let dropped = {
            let mut pending = self.shared.pending();
            let before = pending.len();
            pending.retain(|_, x| x.surface != self.surface);
            before - pending.len()
        };
        if dropped > 0 {
            log::debug!(
                "release: player_id={} dropped {dropped} pending call(s)",
                self.player_id
            );
        }

        // the id stays taken until the surface is gone
        let closed = self.shared.host.close_surface(&self.player_id).await;
        self.shared.remove_surface(&self.player_id, self.surface);
        closed?;

        Ok(())
    }
}
