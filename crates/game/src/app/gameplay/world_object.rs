use engine::{Entity, EntityId, Vec2};

/// The slice of an engine entity a gameplay object reads and drives.
///
/// Gameplay code mutates this plain copy; the scene pulls positions out of the
/// world after physics and pushes velocity and visuals back before the next step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WorldObject {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    /// World pixels per second.
    pub(crate) velocity: Vec2,
    pub(crate) flip_x: bool,
    pub(crate) tint: Option<[u8; 4]>,
    pub(crate) massless: bool,
    animation: String,
}

impl WorldObject {
    pub(crate) fn new(id: EntityId, position: Vec2, animation: &str) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            flip_x: false,
            tint: None,
            massless: false,
            animation: animation.to_string(),
        }
    }

    pub(crate) fn animation(&self) -> &str {
        &self.animation
    }

    /// Switches the displayed animation, leaving it untouched if already playing.
    pub(crate) fn play(&mut self, animation: &str) {
        if self.animation != animation {
            self.animation.clear();
            self.animation.push_str(animation);
        }
    }

    pub(crate) fn pull_from(&mut self, entity: &Entity) {
        self.position = entity.transform.position;
        if let Some(body) = &entity.body {
            self.velocity = body.velocity;
        }
    }

    pub(crate) fn push_to(&self, entity: &mut Entity) {
        entity.renderable.set_sprite_key(&self.animation);
        entity.flip_x = self.flip_x;
        entity.tint = self.tint;
        if let Some(body) = entity.body.as_mut() {
            body.velocity = self.velocity;
            if self.massless {
                body.mass = 0.0;
            }
        }
    }
}
