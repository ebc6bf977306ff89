//! Seam between the bridge and the technology that actually plays video.
//!
//! A backend creates one [`PlayerInstance`] per `initialize` call. Instances
//! receive structured [`Command`]s and answer with a [`CommandResult`]; they
//! report lifecycle and state callbacks through the [`EventSink`] handed to
//! them at creation.

use async_trait::async_trait;
use thiserror::Error;
use youtube_player_models::{CommandResult, PlayerEvent, PlayerEventData, PlayerOptions};

use crate::command::Command;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The underlying player technology failed; the message is passed through.
    #[error("{0}")]
    Underlying(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Factory for underlying player instances.
#[async_trait]
pub trait PlayerBackend: Send + Sync + 'static {
    type Instance: PlayerInstance;

    /// Creates the underlying player (and any UI surface it occupies).
    ///
    /// The instance must emit [`PlayerEventData::Ready`] through `sink` once it
    /// accepts commands.
    ///
    /// # Errors
    ///
    /// * If the underlying player could not be created
    async fn create(
        &self,
        options: &PlayerOptions,
        sink: EventSink,
    ) -> Result<Self::Instance, BackendError>;
}

/// One live underlying player.
#[async_trait]
pub trait PlayerInstance: Send + Sync + 'static {
    /// Invokes the underlying method matching `command`.
    ///
    /// # Errors
    ///
    /// * If the arguments could not be serialized for the transport
    /// * If the transport to the underlying player failed
    async fn call(&self, command: &Command) -> Result<CommandResult, BackendError>;

    /// Releases the underlying player and its UI surface.
    ///
    /// # Errors
    ///
    /// * If the underlying player failed to tear down
    async fn release(&self) -> Result<(), BackendError>;
}

#[derive(Debug)]
pub struct RelayMessage {
    pub(crate) generation: u64,
    pub(crate) event: PlayerEvent,
}

/// Channel through which an instance reports events back to the bridge.
///
/// Events are queued and applied on the bridge's event context, never on the
/// caller's thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    player_id: String,
    generation: u64,
    sender: flume::Sender<RelayMessage>,
}

impl EventSink {
    pub(crate) const fn new(
        player_id: String,
        generation: u64,
        sender: flume::Sender<RelayMessage>,
    ) -> Self {
        Self {
            player_id,
            generation,
            sender,
        }
    }

    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Queues an event for delivery.
    ///
    /// Returns `false` once the bridge that created this sink is gone.
    pub fn emit(&self, data: PlayerEventData) -> bool {
        log::trace!("emit: player_id={} event={}", self.player_id, data.kind());

        self.sender
            .send(RelayMessage {
                generation: self.generation,
                event: PlayerEvent::new(self.player_id.clone(), data),
            })
            .is_ok()
    }
}
