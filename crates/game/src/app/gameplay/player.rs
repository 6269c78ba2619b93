use engine::{EntityId, InputAction, InputSnapshot, SceneWorld, Vec2};
use thiserror::Error;
use tracing::{debug, info};

use super::events::{EventBus, GameEvent};
use super::loot_box::{LootBox, CONTENT_KEY, CONTENT_LIFE, CONTENT_RUBY};
use super::world_object::WorldObject;

pub(crate) const MAX_HEALTH: i32 = 3;
pub(crate) const PLAYER_SPEED: f32 = 3.0;
pub(crate) const DAMAGE_GRACE_MS: f32 = 500.0;
pub(crate) const PLAYER_ATTACK_MS: f32 = 2000.0;
pub(crate) const KNOCKBACK_SPEED: f32 = 100.0;
const DAMAGE_TINT: [u8; 4] = [255, 0, 0, 255];

const ANIM_IDLE: &str = "player-idle";
const ANIM_LEFT: &str = "player-move-left";
const ANIM_RIGHT: &str = "player-move-right";
const ANIM_UP: &str = "player-move-up";
const ANIM_DOWN: &str = "player-move-down";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerState {
    Idle,
    TakingDamage,
    Dead,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum PlayerError {
    #[error("player attack requested but no hitbox spawner is configured")]
    SpawnerMissing,
}

/// Places attack hitboxes into the world on the player's behalf.
pub(crate) trait HitboxSpawner {
    fn spawn_attack_hitbox(&mut self, world: &mut SceneWorld, at: Vec2) -> EntityId;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlayerInput {
    pub(crate) left: bool,
    pub(crate) right: bool,
    pub(crate) up: bool,
    pub(crate) down: bool,
    /// Pressed this tick, not merely held.
    pub(crate) interact_pressed: bool,
}

impl PlayerInput {
    pub(crate) fn from_snapshot(input: &InputSnapshot) -> Self {
        Self {
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
            up: input.is_down(InputAction::MoveUp),
            down: input.is_down(InputAction::MoveDown),
            interact_pressed: input.interact_pressed(),
        }
    }
}

pub(crate) struct Player {
    pub(crate) object: WorldObject,
    state: PlayerState,
    health: i32,
    damage_elapsed_ms: f32,
    can_attack: bool,
    attacking: bool,
    attack_elapsed_ms: f32,
    active_box: Option<EntityId>,
    speed: f32,
    bus: EventBus,
    spawner: Option<Box<dyn HitboxSpawner>>,
}

impl Player {
    pub(crate) fn new(id: EntityId, position: Vec2, bus: EventBus) -> Self {
        Self {
            object: WorldObject::new(id, position, ANIM_IDLE),
            state: PlayerState::Idle,
            health: MAX_HEALTH,
            damage_elapsed_ms: 0.0,
            can_attack: false,
            attacking: false,
            attack_elapsed_ms: 0.0,
            active_box: None,
            speed: PLAYER_SPEED,
            bus,
            spawner: None,
        }
    }

    pub(crate) fn set_spawner(&mut self, spawner: Box<dyn HitboxSpawner>) {
        self.spawner = Some(spawner);
    }

    /// Remembers the last box the player touched; boxes are looked up by id on use.
    pub(crate) fn set_active_box(&mut self, id: EntityId) {
        self.active_box = Some(id);
    }

    pub(crate) fn active_box(&self) -> Option<EntityId> {
        self.active_box
    }

    pub(crate) fn update(&mut self, input: &PlayerInput, delta_ms: f32, boxes: &mut [LootBox]) {
        match self.state {
            PlayerState::TakingDamage => return,
            PlayerState::Dead => {
                self.object.velocity = Vec2::ZERO;
                return;
            }
            PlayerState::Idle => {}
        }

        if input.interact_pressed {
            self.use_active_box(boxes);
        }

        let (direction, animation) = if input.left {
            (Vec2::new(-1.0, 0.0), ANIM_LEFT)
        } else if input.right {
            (Vec2::new(1.0, 0.0), ANIM_RIGHT)
        } else if input.up {
            (Vec2::new(0.0, -1.0), ANIM_UP)
        } else if input.down {
            (Vec2::new(0.0, 1.0), ANIM_DOWN)
        } else {
            (Vec2::ZERO, ANIM_IDLE)
        };
        self.object.velocity = direction * (self.speed * delta_ms);
        self.object.play(animation);
    }

    fn use_active_box(&mut self, boxes: &mut [LootBox]) {
        let Some(active) = self.active_box else {
            return;
        };
        let Some(loot) = boxes.iter_mut().find(|loot| loot.object.id == active) else {
            return;
        };
        let Some(content) = loot.open() else {
            debug!(box_id = active.0, "box_already_open");
            return;
        };
        info!(box_id = active.0, content = %content, "box_opened");
        match content.as_str() {
            CONTENT_RUBY => self.can_attack = true,
            CONTENT_KEY => self.bus.publish(GameEvent::PlayerCollectedKey, None),
            CONTENT_LIFE => {
                self.health = (self.health + 1).min(MAX_HEALTH);
                self.bus
                    .publish(GameEvent::PlayerHealthChanged, Some(self.health));
            }
            _ => {}
        }
    }

    pub(crate) fn advance_time(&mut self, delta_ms: f32) {
        if self.state == PlayerState::TakingDamage {
            self.damage_elapsed_ms += delta_ms;
            if self.damage_elapsed_ms >= DAMAGE_GRACE_MS {
                self.object.tint = None;
                self.state = PlayerState::Idle;
                self.damage_elapsed_ms = 0.0;
            }
        }

        if self.attacking {
            self.attack_elapsed_ms += delta_ms;
            if self.attack_elapsed_ms >= PLAYER_ATTACK_MS {
                self.attacking = false;
                self.attack_elapsed_ms = 0.0;
            }
        }
    }

    /// Callers check `can_attack` and `is_attacking` first.
    pub(crate) fn attack(
        &mut self,
        world: &mut SceneWorld,
        target: Vec2,
    ) -> Result<EntityId, PlayerError> {
        let spawner = self.spawner.as_mut().ok_or(PlayerError::SpawnerMissing)?;
        self.attacking = true;
        self.attack_elapsed_ms = 0.0;
        let hitbox = spawner.spawn_attack_hitbox(world, target);
        info!(hitbox = hitbox.0, x = target.x, y = target.y, "player_attacked");
        Ok(hitbox)
    }

    /// Returns whether the hit landed.
    pub(crate) fn handle_damage_taken(&mut self, source: Vec2) -> bool {
        if !self.can_be_attacked() {
            return false;
        }

        self.object.velocity = (self.object.position - source)
            .normalized()
            .scaled(KNOCKBACK_SPEED);
        self.object.tint = Some(DAMAGE_TINT);
        self.state = PlayerState::TakingDamage;
        self.damage_elapsed_ms = 0.0;
        self.health = (self.health - 1).max(0);
        info!(health = self.health, "player_damaged");

        if self.health == 0 {
            self.state = PlayerState::Dead;
            info!("player_died");
            self.bus.publish(GameEvent::GameOver, None);
        }
        true
    }

    pub(crate) fn can_be_attacked(&self) -> bool {
        !matches!(self.state, PlayerState::TakingDamage | PlayerState::Dead)
    }

    pub(crate) fn state(&self) -> PlayerState {
        self.state
    }

    pub(crate) fn health(&self) -> i32 {
        self.health
    }

    pub(crate) fn can_attack(&self) -> bool {
        self.can_attack
    }

    pub(crate) fn is_attacking(&self) -> bool {
        self.attacking
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.state == PlayerState::Dead
    }
}
