use engine::{EntityId, Vec2};

use super::world_object::WorldObject;

pub(crate) const DOOR_CLOSED: &str = "door-closed";
pub(crate) const DOOR_OPEN: &str = "door-open";

/// Level exit. Its displayed animation doubles as its state.
#[derive(Debug, Clone)]
pub(crate) struct Door {
    pub(crate) object: WorldObject,
}

impl Door {
    pub(crate) fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            object: WorldObject::new(id, position, DOOR_CLOSED),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.object.animation() == DOOR_OPEN
    }

    pub(crate) fn open(&mut self) {
        self.object.play(DOOR_OPEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_starts_closed_and_opens() {
        let mut door = Door::new(EntityId(2), Vec2::new(16.0, 16.0));
        assert!(!door.is_open());
        door.open();
        assert!(door.is_open());
        assert_eq!(door.object.animation(), DOOR_OPEN);
    }
}
