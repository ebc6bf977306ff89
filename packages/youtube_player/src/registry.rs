use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use thiserror::Error;
use youtube_player_models::{PlayerEventData, PlayerEventsState};

/// Bookkeeping for one live player.
///
/// A handle is registered before its underlying instance exists, so events
/// the instance reports while it is still being created are not lost. The
/// instance is attached once creation finishes.
#[derive(Debug)]
pub struct PlayerHandle<I> {
    player_id: String,
    generation: u64,
    debug: bool,
    ready: AtomicBool,
    destroyed: AtomicBool,
    released: AtomicBool,
    events: Mutex<PlayerEventsState>,
    instance: OnceLock<I>,
}

impl<I> PlayerHandle<I> {
    pub fn new(player_id: impl Into<String>, generation: u64, debug: bool) -> Self {
        Self {
            player_id: player_id.into(),
            generation,
            debug,
            ready: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            released: AtomicBool::new(false),
            events: Mutex::new(PlayerEventsState::default()),
            instance: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Distinguishes this handle from earlier players that used the same id.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Whether `onReady` was seen and the instance is attached.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.instance.get().is_some()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Starts tearing this player down.
    ///
    /// Returns `false` if a teardown was already started.
    pub fn mark_destroyed(&self) -> bool {
        !self.destroyed.swap(true, Ordering::SeqCst)
    }

    /// Attaches the created instance.
    ///
    /// # Errors
    ///
    /// * Hands `instance` back if one was already attached
    pub fn attach(&self, instance: I) -> Result<(), I> {
        self.instance.set(instance)
    }

    #[must_use]
    pub fn instance(&self) -> Option<&I> {
        self.instance.get()
    }

    /// The instance, for the one caller that gets to release it.
    ///
    /// Returns `None` while no instance is attached or once it was claimed.
    #[must_use]
    pub fn claim_release(&self) -> Option<&I> {
        let instance = self.instance.get()?;
        (!self.released.swap(true, Ordering::SeqCst)).then_some(instance)
    }

    pub fn record_event(&self, data: &PlayerEventData) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(data);
    }

    #[must_use]
    pub fn events_state(&self) -> PlayerEventsState {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Player '{0}' is already initialized")]
    DuplicateId(String),
    #[error("Player '{0}' not found")]
    NotFound(String),
}

/// Live players keyed by id.
///
/// Not synchronized itself; the bridge owns it behind a lock.
#[derive(Debug)]
pub struct PlayerRegistry<I> {
    players: BTreeMap<String, Arc<PlayerHandle<I>>>,
}

impl<I> Default for PlayerRegistry<I> {
    fn default() -> Self {
        Self {
            players: BTreeMap::new(),
        }
    }
}

impl<I> PlayerRegistry<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// * [`RegistryError::DuplicateId`] if a player with the same id is live
    pub fn register(&mut self, handle: Arc<PlayerHandle<I>>) -> Result<(), RegistryError> {
        if self.players.contains_key(handle.player_id()) {
            return Err(RegistryError::DuplicateId(handle.player_id().to_string()));
        }

        self.players.insert(handle.player_id().to_string(), handle);
        Ok(())
    }

    /// # Errors
    ///
    /// * [`RegistryError::NotFound`] if no player has this id
    pub fn lookup(&self, player_id: &str) -> Result<Arc<PlayerHandle<I>>, RegistryError> {
        self.players
            .get(player_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(player_id.to_string()))
    }

    /// # Errors
    ///
    /// * [`RegistryError::NotFound`] if no player has this id
    pub fn unregister(&mut self, player_id: &str) -> Result<Arc<PlayerHandle<I>>, RegistryError> {
        self.players
            .remove(player_id)
            .ok_or_else(|| RegistryError::NotFound(player_id.to_string()))
    }

    #[must_use]
    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Removes `player_id` only if it is still registered under `generation`.
    pub fn unregister_generation(
        &mut self,
        player_id: &str,
        generation: u64,
    ) -> Option<Arc<PlayerHandle<I>>> {
        if self
            .players
            .get(player_id)
            .is_some_and(|x| x.generation() == generation)
        {
            self.players.remove(player_id)
        } else {
            None
        }
    }

    /// Ids of all live players, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    pub fn handles(&self) -> impl Iterator<Item = &Arc<PlayerHandle<I>>> {
        self.players.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Removes every player, returning their handles.
    pub fn drain(&mut self) -> Vec<Arc<PlayerHandle<I>>> {
        std::mem::take(&mut self.players).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn handle(id: &str, generation: u64) -> Arc<PlayerHandle<()>> {
        Arc::new(PlayerHandle::new(id, generation, false))
    }

    #[test_log::test]
    fn register_then_lookup() {
        let mut registry = PlayerRegistry::new();
        registry.register(handle("p1", 1)).unwrap();

        let found = registry.lookup("p1").unwrap();

        assert_eq!(found.player_id(), "p1");
        assert_eq!(found.generation(), 1);
        assert!(!found.is_ready());
    }

    #[test_log::test]
    fn duplicate_ids_are_rejected_and_keep_the_original() {
        let mut registry = PlayerRegistry::new();
        registry.register(handle("p1", 1)).unwrap();

        assert_eq!(
            registry.register(handle("p1", 2)),
            Err(RegistryError::DuplicateId("p1".to_string()))
        );
        assert_eq!(registry.lookup("p1").unwrap().generation(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test_log::test]
    fn unregister_removes_the_player() {
        let mut registry = PlayerRegistry::new();
        registry.register(handle("p1", 1)).unwrap();

        registry.unregister("p1").unwrap();

        assert!(!registry.contains("p1"));
        assert!(registry.is_empty());
        assert_eq!(
            registry.lookup("p1").unwrap_err(),
            RegistryError::NotFound("p1".to_string())
        );
        assert_eq!(
            registry.unregister("p1").unwrap_err(),
            RegistryError::NotFound("p1".to_string())
        );
    }

    #[test_log::test]
    fn ids_are_sorted_and_drain_empties() {
        let mut registry = PlayerRegistry::new();
        registry.register(handle("b", 1)).unwrap();
        registry.register(handle("a", 2)).unwrap();

        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }

    #[test_log::test]
    fn unregister_generation_keeps_newer_players() {
        let mut registry = PlayerRegistry::new();
        registry.register(handle("p1", 2)).unwrap();

        assert!(registry.unregister_generation("p1", 1).is_none());
        assert!(registry.contains("p1"));
        assert_eq!(registry.unregister_generation("p1", 2).unwrap().generation(), 2);
        assert!(registry.is_empty());
    }

    #[test_log::test]
    fn handle_records_events_and_readiness() {
        let handle = handle("p1", 1);
        handle.mark_ready();
        handle.record_event(&PlayerEventData::Ready);

        assert!(!handle.is_ready());
        handle.attach(()).unwrap();
        assert!(handle.is_ready());
        assert_eq!(handle.events_state().events.len(), 1);
        assert!(handle.mark_destroyed());
        assert!(!handle.mark_destroyed());
        assert!(handle.is_destroyed());
    }

    #[test_log::test]
    fn release_is_claimed_once_and_only_after_attach() {
        let handle = handle("p1", 1);

        assert!(handle.claim_release().is_none());
        handle.attach(()).unwrap();
        assert_eq!(handle.attach(()), Err(()));
        assert!(handle.claim_release().is_some());
        assert!(handle.claim_release().is_none());
    }
}
