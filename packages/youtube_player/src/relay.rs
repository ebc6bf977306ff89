use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use youtube_player_models::{PlayerEvent, PlayerEventKind};

pub type EventListener = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

type ListenerKey = (String, PlayerEventKind);

/// Fans player events out to subscribers of `(player id, event)`.
///
/// Subscriptions may be registered before the player exists. Listeners are
/// called in registration order, outside of the internal lock, so a listener
/// may subscribe or unsubscribe while being invoked.
#[derive(Default)]
pub struct EventRelay {
    listeners: RwLock<BTreeMap<ListenerKey, Vec<EventListener>>>,
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventRelay")
            .field(
                "listeners",
                &listeners
                    .iter()
                    .map(|(key, list)| (key, list.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl EventRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, player_id: &str, event: PlayerEventKind, listener: EventListener) {
        log::debug!("subscribe: player_id={player_id} event={event}");

        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((player_id.to_string(), event))
            .or_default()
            .push(listener);
    }

    /// Removes one registration of `listener`.
    ///
    /// Returns `false` if it was not subscribed.
    pub fn unsubscribe(
        &self,
        player_id: &str,
        event: PlayerEventKind,
        listener: &EventListener,
    ) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (player_id.to_string(), event);

        let Some(list) = listeners.get_mut(&key) else {
            return false;
        };
        let Some(index) = list.iter().position(|x| Arc::ptr_eq(x, listener)) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            listeners.remove(&key);
        }

        log::debug!("unsubscribe: player_id={player_id} event={event}");
        true
    }

    /// Drops every subscription for `player_id`.
    pub fn clear_player(&self, player_id: &str) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _), _| id != player_id);
    }

    #[must_use]
    pub fn listener_count(&self, player_id: &str, event: PlayerEventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(player_id.to_string(), event))
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to its subscribers, returning how many were called.
    pub fn dispatch(&self, event: &PlayerEvent) -> usize {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(event.player_id.clone(), event.kind()))
            .cloned()
            .unwrap_or_default();

        for listener in &listeners {
            listener(event);
        }

        listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use youtube_player_models::{PlayerEventData, PlayerState};

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> EventListener {
        let log = log.clone();
        Arc::new(move |event: &PlayerEvent| {
            log.lock()
                .unwrap()
                .push(format!("{name}:{}:{}", event.player_id, event.kind()));
        })
    }

    #[test_log::test]
    fn listeners_are_called_in_registration_order() {
        let relay = EventRelay::new();
        let log = Arc::new(Mutex::new(vec![]));
        relay.subscribe("p1", PlayerEventKind::OnReady, recorder(&log, "a"));
        relay.subscribe("p1", PlayerEventKind::OnReady, recorder(&log, "b"));

        let count = relay.dispatch(&PlayerEvent::new("p1", PlayerEventData::Ready));

        assert_eq!(count, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:p1:onReady".to_string(), "b:p1:onReady".to_string()]
        );
    }

    #[test_log::test]
    fn events_only_reach_matching_player_and_kind() {
        let relay = EventRelay::new();
        let log = Arc::new(Mutex::new(vec![]));
        relay.subscribe("p1", PlayerEventKind::OnStateChange, recorder(&log, "a"));

        relay.dispatch(&PlayerEvent::new("p2", PlayerEventData::StateChange(PlayerState::Playing)));
        relay.dispatch(&PlayerEvent::new("p1", PlayerEventData::Ready));

        assert!(log.lock().unwrap().is_empty());
    }

    #[test_log::test]
    fn unsubscribe_removes_only_that_listener() {
        let relay = EventRelay::new();
        let log = Arc::new(Mutex::new(vec![]));
        let a = recorder(&log, "a");
        relay.subscribe("p1", PlayerEventKind::OnReady, a.clone());
        relay.subscribe("p1", PlayerEventKind::OnReady, recorder(&log, "b"));

        assert!(relay.unsubscribe("p1", PlayerEventKind::OnReady, &a));
        assert!(!relay.unsubscribe("p1", PlayerEventKind::OnReady, &a));
        relay.dispatch(&PlayerEvent::new("p1", PlayerEventData::Ready));

        assert_eq!(*log.lock().unwrap(), vec!["b:p1:onReady".to_string()]);
    }

    #[test_log::test]
    fn clear_player_drops_all_of_its_subscriptions() {
        let relay = EventRelay::new();
        let log = Arc::new(Mutex::new(vec![]));
        relay.subscribe("p1", PlayerEventKind::OnReady, recorder(&log, "a"));
        relay.subscribe("p1", PlayerEventKind::OnError, recorder(&log, "a"));
        relay.subscribe("p2", PlayerEventKind::OnReady, recorder(&log, "b"));

        relay.clear_player("p1");

        assert_eq!(relay.listener_count("p1", PlayerEventKind::OnReady), 0);
        assert_eq!(relay.listener_count("p1", PlayerEventKind::OnError), 0);
        assert_eq!(relay.listener_count("p2", PlayerEventKind::OnReady), 1);
    }

    #[test_log::test]
    fn listener_may_subscribe_during_dispatch() {
        let relay = Arc::new(EventRelay::new());
        let inner = relay.clone();
        relay.subscribe(
            "p1",
            PlayerEventKind::OnReady,
            Arc::new(move |_: &PlayerEvent| {
                inner.subscribe("p1", PlayerEventKind::OnError, Arc::new(|_: &PlayerEvent| {}));
            }),
        );

        relay.dispatch(&PlayerEvent::new("p1", PlayerEventData::Ready));

        assert_eq!(relay.listener_count("p1", PlayerEventKind::OnError), 1);
    }
}
