use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum GameEvent {
    /// Payload: the player's health after the change.
    PlayerHealthChanged,
    PlayerCollectedKey,
    GameOver,
    ShowWinScreen,
}

impl GameEvent {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::PlayerHealthChanged => "player_health_changed",
            Self::PlayerCollectedKey => "player_collected_key",
            Self::GameOver => "game_over",
            Self::ShowWinScreen => "show_win_screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandlerId(u64);

type Handler = Rc<dyn Fn(Option<i32>)>;

#[derive(Default)]
struct Registry {
    next_handler_id: u64,
    handlers: BTreeMap<GameEvent, Vec<(HandlerId, Handler)>>,
}

/// Synchronous publish/subscribe channel shared by one game session.
///
/// Cloning hands out another handle to the same registry. Handlers run on the
/// publishing call stack in registration order.
#[derive(Clone, Default)]
pub(crate) struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(
        &self,
        event: GameEvent,
        handler: impl Fn(Option<i32>) + 'static,
    ) -> HandlerId {
        let mut registry = self.registry.borrow_mut();
        let id = HandlerId(registry.next_handler_id);
        registry.next_handler_id = registry.next_handler_id.saturating_add(1);
        registry
            .handlers
            .entry(event)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Removes exactly the handler registered under `id`.
    pub(crate) fn unsubscribe(&self, event: GameEvent, id: HandlerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(handlers) = registry.handlers.get_mut(&event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        before != handlers.len()
    }

    pub(crate) fn publish(&self, event: GameEvent, payload: Option<i32>) {
        // Snapshot first so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<Handler> = self
            .registry
            .borrow()
            .handlers
            .get(&event)
            .map(|entries| entries.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();
        debug!(
            event = event.name(),
            payload = ?payload,
            handlers = handlers.len(),
            "event_published"
        );
        for handler in handlers {
            handler(payload);
        }
    }

    #[cfg(test)]
    pub(crate) fn handler_count(&self, event: GameEvent) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(&event)
            .map_or(0, Vec::len)
    }
}

/// Subscriptions owned by one component, released together on teardown.
#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    entries: Vec<(GameEvent, HandlerId)>,
}

impl Subscriptions {
    pub(crate) fn subscribe(
        &mut self,
        bus: &EventBus,
        event: GameEvent,
        handler: impl Fn(Option<i32>) + 'static,
    ) {
        let id = bus.subscribe(event, handler);
        self.entries.push((event, id));
    }

    pub(crate) fn release(&mut self, bus: &EventBus) {
        for (event, id) in self.entries.drain(..) {
            bus.unsubscribe(event, id);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
