use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use engine::{EntityId, SceneWorld, Vec2};
use tracing::{debug, info};

use super::door::Door;
use super::events::{EventBus, GameEvent, Subscriptions};
use super::loot_box::LootBox;
use super::player::{Player, PlayerError, PLAYER_ATTACK_MS};
use super::skeleton::{Skeleton, SkeletonTick};
use super::world_object::WorldObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityKind {
    Player,
    Skeleton,
    Box,
    Door,
    AttackHitbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameState {
    Running,
    /// Gameplay is paused; only a restart is accepted.
    LevelComplete,
    /// The world keeps running around a dead player.
    GameOver,
}

#[derive(Debug, Clone, Copy)]
struct AttackHitbox {
    id: EntityId,
    elapsed_ms: f32,
}

/// Owns one session's entities and applies the collision rules between them.
pub(crate) struct Encounter {
    bus: EventBus,
    kinds: BTreeMap<EntityId, EntityKind>,
    pub(crate) player: Player,
    pub(crate) skeletons: Vec<Skeleton>,
    pub(crate) boxes: Vec<LootBox>,
    pub(crate) door: Door,
    hitboxes: Vec<AttackHitbox>,
    key_collected: Rc<Cell<bool>>,
    state: Rc<Cell<GameState>>,
    subscriptions: Subscriptions,
}

impl Encounter {
    pub(crate) fn new(bus: EventBus, player: Player, door: Door) -> Self {
        let key_collected = Rc::new(Cell::new(false));
        let state = Rc::new(Cell::new(GameState::Running));
        let mut subscriptions = Subscriptions::default();

        let flag = Rc::clone(&key_collected);
        subscriptions.subscribe(&bus, GameEvent::PlayerCollectedKey, move |_| flag.set(true));
        let game_state = Rc::clone(&state);
        subscriptions.subscribe(&bus, GameEvent::GameOver, move |_| {
            if game_state.get() == GameState::Running {
                game_state.set(GameState::GameOver);
            }
        });

        let mut kinds = BTreeMap::new();
        kinds.insert(player.object.id, EntityKind::Player);
        kinds.insert(door.object.id, EntityKind::Door);
        Self {
            bus,
            kinds,
            player,
            skeletons: Vec::new(),
            boxes: Vec::new(),
            door,
            hitboxes: Vec::new(),
            key_collected,
            state,
            subscriptions,
        }
    }

    pub(crate) fn add_skeleton(&mut self, skeleton: Skeleton) {
        self.kinds.insert(skeleton.object.id, EntityKind::Skeleton);
        self.skeletons.push(skeleton);
    }

    pub(crate) fn add_box(&mut self, loot: LootBox) {
        self.kinds.insert(loot.object.id, EntityKind::Box);
        self.boxes.push(loot);
    }

    pub(crate) fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.kinds.get(&id).copied()
    }

    pub(crate) fn state(&self) -> GameState {
        self.state.get()
    }

    pub(crate) fn key_collected(&self) -> bool {
        self.key_collected.get()
    }

    pub(crate) fn hitbox_count(&self) -> usize {
        self.hitboxes.len()
    }

    pub(crate) fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        std::iter::once(&self.player.object)
            .chain(std::iter::once(&self.door.object))
            .chain(self.skeletons.iter().map(|skeleton| &skeleton.object))
            .chain(self.boxes.iter().map(|loot| &loot.object))
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = &mut WorldObject> {
        std::iter::once(&mut self.player.object)
            .chain(std::iter::once(&mut self.door.object))
            .chain(self.skeletons.iter_mut().map(|skeleton| &mut skeleton.object))
            .chain(self.boxes.iter_mut().map(|loot| &mut loot.object))
    }

    /// Attack trigger: ignored unless the player may attack right now.
    pub(crate) fn trigger_attack(
        &mut self,
        world: &mut SceneWorld,
        target: Vec2,
    ) -> Result<Option<EntityId>, PlayerError> {
        if self.player.is_dead() || !self.player.can_attack() || self.player.is_attacking() {
            return Ok(None);
        }
        let id = self.player.attack(world, target)?;
        self.kinds.insert(id, EntityKind::AttackHitbox);
        self.hitboxes.push(AttackHitbox {
            id,
            elapsed_ms: 0.0,
        });
        Ok(Some(id))
    }

    /// Advances skeleton and hitbox timers. Returns entities that must leave the world.
    pub(crate) fn tick(&mut self, delta_ms: f32) -> Vec<EntityId> {
        let mut removed = Vec::new();

        self.skeletons.retain_mut(|skeleton| match skeleton.tick(delta_ms) {
            SkeletonTick::Alive => true,
            SkeletonTick::Destroyed => {
                removed.push(skeleton.object.id);
                false
            }
        });

        self.hitboxes.retain_mut(|hitbox| {
            hitbox.elapsed_ms += delta_ms;
            if hitbox.elapsed_ms >= PLAYER_ATTACK_MS {
                removed.push(hitbox.id);
                return false;
            }
            true
        });

        for id in &removed {
            self.kinds.remove(id);
        }
        removed
    }

    pub(crate) fn on_tile_contact(&mut self, id: EntityId) {
        if self.kind_of(id) != Some(EntityKind::Skeleton) {
            return;
        }
        if let Some(skeleton) = self.skeleton_mut(id) {
            skeleton.on_tile_collision();
        }
    }

    /// Dispatches one unordered body contact by the kinds of both sides.
    pub(crate) fn on_contact(&mut self, a: EntityId, b: EntityId) {
        let (Some(kind_a), Some(kind_b)) = (self.kind_of(a), self.kind_of(b)) else {
            return;
        };
        match (kind_a, kind_b) {
            (EntityKind::Skeleton, EntityKind::Player) => self.skeleton_hits_player(a),
            (EntityKind::Player, EntityKind::Skeleton) => self.skeleton_hits_player(b),
            (EntityKind::Player, EntityKind::Box) => self.player.set_active_box(b),
            (EntityKind::Box, EntityKind::Player) => self.player.set_active_box(a),
            (EntityKind::Player, EntityKind::Door) | (EntityKind::Door, EntityKind::Player) => {
                self.player_reaches_door()
            }
            (EntityKind::AttackHitbox, EntityKind::Skeleton) => self.hitbox_hits_skeleton(b),
            (EntityKind::Skeleton, EntityKind::AttackHitbox) => self.hitbox_hits_skeleton(a),
            _ => {}
        }
    }

    fn skeleton_hits_player(&mut self, skeleton_id: EntityId) {
        if !self.player.can_be_attacked() {
            return;
        }
        let Some(skeleton) = self
            .skeletons
            .iter_mut()
            .find(|skeleton| skeleton.object.id == skeleton_id)
        else {
            return;
        };
        if skeleton.is_dead() {
            return;
        }

        self.player.handle_damage_taken(skeleton.object.position);
        self.bus
            .publish(GameEvent::PlayerHealthChanged, Some(self.player.health()));
        skeleton.attack();
    }

    fn player_reaches_door(&mut self) {
        if self.door.is_open() || !self.key_collected.get() {
            return;
        }
        self.door.open();
        self.state.set(GameState::LevelComplete);
        info!("level_complete");
        self.bus.publish(GameEvent::ShowWinScreen, None);
    }

    fn hitbox_hits_skeleton(&mut self, skeleton_id: EntityId) {
        if let Some(skeleton) = self.skeleton_mut(skeleton_id) {
            debug!(skeleton = skeleton_id.0, "skeleton_hit");
            skeleton.take_damage();
        }
    }

    fn skeleton_mut(&mut self, id: EntityId) -> Option<&mut Skeleton> {
        self.skeletons
            .iter_mut()
            .find(|skeleton| skeleton.object.id == id)
    }

    /// Drops bus subscriptions and every skeleton's reroll timer.
    pub(crate) fn teardown(&mut self) {
        self.subscriptions.release(&self.bus);
        for skeleton in &mut self.skeletons {
            skeleton.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::app::gameplay::loot_box::{CONTENT_KEY, CONTENT_RUBY};
    use crate::app::gameplay::player::{
        HitboxSpawner, PlayerInput, PlayerState, DAMAGE_GRACE_MS, MAX_HEALTH,
    };
    use crate::app::gameplay::skeleton::{SkeletonState, SKELETON_DEATH_MS};
    use engine::{RenderableDesc, Transform};

    const PLAYER: EntityId = EntityId(1);
    const DOOR: EntityId = EntityId(2);
    const SKELETON: EntityId = EntityId(3);
    const OTHER_SKELETON: EntityId = EntityId(4);
    const KEY_BOX: EntityId = EntityId(5);
    const RUBY_BOX: EntityId = EntityId(6);

    type EventLog = Rc<RefCell<Vec<(GameEvent, Option<i32>)>>>;

    struct WorldSpawner;

    impl HitboxSpawner for WorldSpawner {
        fn spawn_attack_hitbox(&mut self, world: &mut SceneWorld, at: Vec2) -> EntityId {
            world.spawn(
                Transform { position: at },
                RenderableDesc::sprite("attack", "attack", [255, 255, 255, 255]),
            )
        }
    }

    fn encounter() -> (Encounter, EventLog) {
        let bus = EventBus::new();
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        for event in [
            GameEvent::PlayerHealthChanged,
            GameEvent::PlayerCollectedKey,
            GameEvent::GameOver,
            GameEvent::ShowWinScreen,
        ] {
            let sink = Rc::clone(&log);
            bus.subscribe(event, move |payload| sink.borrow_mut().push((event, payload)));
        }

        let mut player = Player::new(PLAYER, Vec2::new(32.0, 32.0), bus.clone());
        player.set_spawner(Box::new(WorldSpawner));
        let door = Door::new(DOOR, Vec2::new(80.0, 16.0));
        let mut encounter = Encounter::new(bus, player, door);
        encounter.add_skeleton(Skeleton::new(SKELETON, Vec2::new(40.0, 32.0), 11));
        encounter.add_skeleton(Skeleton::new(OTHER_SKELETON, Vec2::new(24.0, 32.0), 12));
        encounter.add_box(LootBox::new(KEY_BOX, Vec2::new(24.0, 24.0), CONTENT_KEY));
        encounter.add_box(LootBox::new(RUBY_BOX, Vec2::new(48.0, 24.0), CONTENT_RUBY));
        (encounter, log)
    }

    fn open_box(encounter: &mut Encounter, id: EntityId) {
        encounter.on_contact(PLAYER, id);
        let input = PlayerInput {
            interact_pressed: true,
            ..PlayerInput::default()
        };
        encounter
            .player
            .update(&input, 16.0, &mut encounter.boxes);
    }

    fn events(log: &EventLog, event: GameEvent) -> Vec<Option<i32>> {
        log.borrow()
            .iter()
            .filter(|(logged, _)| *logged == event)
            .map(|(_, payload)| *payload)
            .collect()
    }

    fn skeleton(encounter: &Encounter, id: EntityId) -> &Skeleton {
        encounter
            .skeletons
            .iter()
            .find(|skeleton| skeleton.object.id == id)
            .expect("skeleton")
    }

    #[test]
    fn skeleton_contact_damages_player_in_either_order() {
        let (mut encounter, log) = encounter();

        encounter.on_contact(PLAYER, SKELETON);

        assert_eq!(encounter.player.health(), MAX_HEALTH - 1);
        assert_eq!(events(&log, GameEvent::PlayerHealthChanged), vec![Some(2)]);
        assert_eq!(skeleton(&encounter, SKELETON).state(), SkeletonState::Attack);
        assert_eq!(encounter.player.object.velocity, Vec2::new(-100.0, 0.0));

        encounter.player.advance_time(DAMAGE_GRACE_MS);
        encounter.on_contact(OTHER_SKELETON, PLAYER);
        assert_eq!(encounter.player.health(), MAX_HEALTH - 2);
        assert_eq!(encounter.player.object.velocity, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn contact_during_grace_window_is_ignored() {
        let (mut encounter, log) = encounter();
        encounter.on_contact(PLAYER, SKELETON);
        encounter.on_contact(PLAYER, OTHER_SKELETON);

        assert_eq!(encounter.player.health(), MAX_HEALTH - 1);
        assert_eq!(events(&log, GameEvent::PlayerHealthChanged).len(), 1);
        assert_eq!(skeleton(&encounter, OTHER_SKELETON).state(), SkeletonState::Move);
    }

    #[test]
    fn dead_skeleton_does_no_damage() {
        let (mut encounter, log) = encounter();
        encounter.on_contact(SKELETON, EntityId(99));
        encounter.skeletons[0].take_damage();

        encounter.on_contact(PLAYER, SKELETON);

        assert_eq!(encounter.player.health(), MAX_HEALTH);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn final_hit_publishes_game_over_once_then_health() {
        let (mut encounter, log) = encounter();
        for _ in 0..2 {
            encounter.on_contact(PLAYER, SKELETON);
            encounter.player.advance_time(DAMAGE_GRACE_MS);
        }
        assert_eq!(encounter.player.health(), 1);

        encounter.on_contact(PLAYER, SKELETON);
        encounter.on_contact(PLAYER, OTHER_SKELETON);

        assert_eq!(encounter.player.health(), 0);
        assert_eq!(encounter.player.state(), PlayerState::Dead);
        assert_eq!(encounter.state(), GameState::GameOver);
        assert_eq!(events(&log, GameEvent::GameOver).len(), 1);
        assert_eq!(
            events(&log, GameEvent::PlayerHealthChanged),
            vec![Some(2), Some(1), Some(0)]
        );
        let order: Vec<GameEvent> = log.borrow().iter().map(|(event, _)| *event).collect();
        assert_eq!(
            &order[order.len() - 2..],
            &[GameEvent::GameOver, GameEvent::PlayerHealthChanged]
        );
    }

    #[test]
    fn door_without_key_does_nothing() {
        let (mut encounter, log) = encounter();
        encounter.on_contact(DOOR, PLAYER);

        assert!(log.borrow().is_empty());
        assert!(!encounter.door.is_open());
        assert_eq!(encounter.state(), GameState::Running);
    }

    #[test]
    fn key_then_door_wins_once() {
        let (mut encounter, log) = encounter();

        open_box(&mut encounter, KEY_BOX);
        assert!(encounter.key_collected());
        assert_eq!(events(&log, GameEvent::PlayerCollectedKey), vec![None]);

        encounter.on_contact(PLAYER, DOOR);
        encounter.on_contact(PLAYER, DOOR);

        assert_eq!(events(&log, GameEvent::ShowWinScreen), vec![None]);
        assert!(encounter.door.is_open());
        assert_eq!(encounter.state(), GameState::LevelComplete);
    }

    #[test]
    fn box_contact_sets_active_box() {
        let (mut encounter, _) = encounter();
        encounter.on_contact(RUBY_BOX, PLAYER);
        assert_eq!(encounter.player.active_box(), Some(RUBY_BOX));
        encounter.on_contact(PLAYER, KEY_BOX);
        assert_eq!(encounter.player.active_box(), Some(KEY_BOX));
    }

    #[test]
    fn attack_needs_ruby_and_spawns_one_hitbox_at_a_time() {
        let (mut encounter, _) = encounter();
        let mut world = SceneWorld::default();

        let early = encounter
            .trigger_attack(&mut world, Vec2::new(40.0, 32.0))
            .expect("no error");
        assert_eq!(early, None);

        open_box(&mut encounter, RUBY_BOX);
        let hitbox = encounter
            .trigger_attack(&mut world, Vec2::new(40.0, 32.0))
            .expect("no error")
            .expect("hitbox spawned");
        assert_eq!(encounter.kind_of(hitbox), Some(EntityKind::AttackHitbox));

        let again = encounter
            .trigger_attack(&mut world, Vec2::new(40.0, 32.0))
            .expect("no error");
        assert_eq!(again, None);
        assert_eq!(encounter.hitbox_count(), 1);
    }

    #[test]
    fn hitbox_kills_skeleton_which_is_removed_after_death() {
        let (mut encounter, _) = encounter();
        let mut world = SceneWorld::default();
        open_box(&mut encounter, RUBY_BOX);
        let hitbox = encounter
            .trigger_attack(&mut world, Vec2::new(40.0, 32.0))
            .expect("no error")
            .expect("hitbox spawned");

        encounter.on_contact(SKELETON, hitbox);
        assert!(skeleton(&encounter, SKELETON).is_dead());

        assert!(encounter.tick(SKELETON_DEATH_MS - 1.0).is_empty());
        let removed = encounter.tick(1.0);
        assert_eq!(removed, vec![SKELETON, hitbox]);
        assert_eq!(encounter.kind_of(SKELETON), None);
        assert_eq!(encounter.skeletons.len(), 1);

        encounter.on_contact(PLAYER, SKELETON);
        assert_eq!(encounter.player.health(), MAX_HEALTH);
    }

    #[test]
    fn tile_contact_rerolls_only_skeletons() {
        let (mut encounter, _) = encounter();
        let before = skeleton(&encounter, SKELETON).direction();
        encounter.on_tile_contact(SKELETON);
        assert_ne!(skeleton(&encounter, SKELETON).direction(), before);

        encounter.on_tile_contact(PLAYER);
    }

    #[test]
    fn teardown_releases_subscriptions_and_timers() {
        let (mut encounter, _) = encounter();
        let bus = encounter.bus.clone();
        let before = bus.handler_count(GameEvent::GameOver);

        encounter.teardown();

        assert_eq!(bus.handler_count(GameEvent::GameOver), before - 1);
        assert_eq!(bus.handler_count(GameEvent::PlayerCollectedKey), 1);
        assert!(encounter
            .skeletons
            .iter()
            .all(|skeleton| skeleton.timer().is_released()));
    }
}
