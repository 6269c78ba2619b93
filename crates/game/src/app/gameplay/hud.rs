use std::cell::RefCell;
use std::rc::Rc;

use engine::{HeartIcon, HudBanner};

use super::events::{EventBus, GameEvent, Subscriptions};
use super::player::MAX_HEALTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy)]
struct UiState {
    health: i32,
    outcome: Option<Outcome>,
}

/// Hearts and end-of-game text, driven purely by bus events.
pub(crate) struct GameUi {
    bus: EventBus,
    state: Rc<RefCell<UiState>>,
    subscriptions: Subscriptions,
}

impl GameUi {
    pub(crate) fn attach(bus: EventBus) -> Self {
        let state = Rc::new(RefCell::new(UiState {
            health: MAX_HEALTH,
            outcome: None,
        }));
        let mut subscriptions = Subscriptions::default();

        let health_state = Rc::clone(&state);
        subscriptions.subscribe(&bus, GameEvent::PlayerHealthChanged, move |payload| {
            if let Some(health) = payload {
                health_state.borrow_mut().health = health.clamp(0, MAX_HEALTH);
            }
        });
        let win_state = Rc::clone(&state);
        subscriptions.subscribe(&bus, GameEvent::ShowWinScreen, move |_| {
            win_state.borrow_mut().outcome = Some(Outcome::Won);
        });
        let lose_state = Rc::clone(&state);
        subscriptions.subscribe(&bus, GameEvent::GameOver, move |_| {
            lose_state.borrow_mut().outcome = Some(Outcome::Lost);
        });

        Self {
            bus,
            state,
            subscriptions,
        }
    }

    pub(crate) fn hearts(&self) -> Vec<HeartIcon> {
        let health = self.state.borrow().health;
        (0..MAX_HEALTH)
            .map(|index| {
                if index < health {
                    HeartIcon::Full
                } else {
                    HeartIcon::Empty
                }
            })
            .collect()
    }

    pub(crate) fn banner(&self) -> Option<HudBanner> {
        let (title, subtitle) = match self.state.borrow().outcome? {
            Outcome::Won => ("You win!", "Thanks for playing! :)"),
            Outcome::Lost => ("You died!", "Press R to start again!"),
        };
        Some(HudBanner {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        })
    }

    pub(crate) fn detach(&mut self) {
        self.subscriptions.release(&self.bus);
    }
}
