use engine::{
    screen_to_world_px, Body, EntityId, HudView, InputSnapshot, LevelData, RenderableDesc,
    RenderableKind, Scene, SceneCommand, SceneWorld, Transform, Vec2,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, error, info};

use super::door::Door;
use super::encounter::{Encounter, GameState};
use super::events::EventBus;
use super::hud::GameUi;
use super::loot_box::{BoxAnim, LootBox};
use super::player::{HitboxSpawner, Player, PlayerInput};
use super::skeleton::Skeleton;

pub(crate) const CAMERA_LERP: f32 = 0.4;
pub(crate) const CAMERA_ZOOM: f32 = 6.0;
pub(crate) const DEBUG_CAMERA_ZOOM: f32 = 2.0;

const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(5.0, 7.0);
const SKELETON_HALF_EXTENTS: Vec2 = Vec2::new(6.0, 7.0);
const BOX_HALF_EXTENTS: Vec2 = Vec2::new(8.0, 8.0);
const DOOR_HALF_EXTENTS: Vec2 = Vec2::new(8.5, 8.5);
const HITBOX_HALF_EXTENTS: Vec2 = Vec2::new(8.0, 8.0);

const PLAYER_COLOR: [u8; 4] = [90, 170, 255, 255];
const SKELETON_COLOR: [u8; 4] = [220, 220, 200, 255];
const BOX_COLOR: [u8; 4] = [170, 110, 50, 255];
const DOOR_COLOR: [u8; 4] = [110, 70, 40, 255];
const HITBOX_COLOR: [u8; 4] = [255, 240, 120, 200];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SceneOptions {
    pub(crate) debug: bool,
    pub(crate) seed: u64,
}

/// Spawns zero-mass hitboxes that overlap skeletons without pushing them.
struct AttackHitboxes;

impl HitboxSpawner for AttackHitboxes {
    fn spawn_attack_hitbox(&mut self, world: &mut SceneWorld, at: Vec2) -> EntityId {
        world.spawn_with_body(
            Transform { position: at },
            RenderableDesc::sprite("attack", "attack", HITBOX_COLOR),
            Body::dynamic(HITBOX_HALF_EXTENTS)
                .with_mass(0.0)
                .with_tile_collision(false),
        )
    }
}

pub(crate) struct DungeonScene {
    level: LevelData,
    debug: bool,
    seeds: Pcg32,
    bus: EventBus,
    encounter: Option<Encounter>,
    ui: Option<GameUi>,
}

impl DungeonScene {
    pub(crate) fn new(level: LevelData, options: SceneOptions) -> Self {
        Self {
            level,
            debug: options.debug,
            seeds: Pcg32::seed_from_u64(options.seed),
            bus: EventBus::new(),
            encounter: None,
            ui: None,
        }
    }

    fn spawn_entity(
        world: &mut SceneWorld,
        position: Vec2,
        debug_name: &'static str,
        color: [u8; 4],
        body: Body,
    ) -> EntityId {
        world.spawn_with_body(
            Transform { position },
            RenderableDesc {
                kind: RenderableKind::Placeholder,
                debug_name,
                placeholder_color: color,
            },
            body,
        )
    }

    fn debug_lines(&self, encounter: &Encounter) -> Vec<String> {
        let player = &encounter.player;
        vec![
            format!(
                "player {:.0},{:.0} hp {} {:?}",
                player.object.position.x,
                player.object.position.y,
                player.health(),
                player.state()
            ),
            format!(
                "attack {} key {}",
                if player.can_attack() { "yes" } else { "no" },
                if encounter.key_collected() { "yes" } else { "no" }
            ),
            format!(
                "boxes {} opened {} spent active {:?}",
                encounter
                    .boxes
                    .iter()
                    .filter(|loot| *loot.anim() != BoxAnim::Closed)
                    .count(),
                encounter
                    .boxes
                    .iter()
                    .filter(|loot| !loot.is_collectable())
                    .count(),
                player.active_box().map(|id| id.0)
            ),
            format!(
                "hitboxes {} state {:?}",
                encounter.hitbox_count(),
                encounter.state()
            ),
        ]
        .into_iter()
        .chain(encounter.skeletons.iter().map(|skeleton| {
            format!(
                "skeleton {} {:?} {:?}",
                skeleton.object.id.0,
                skeleton.state(),
                skeleton.direction()
            )
        }))
        .collect()
    }
}

impl Scene for DungeonScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.set_tilemap(self.level.tilemap.clone());

        let door_id = Self::spawn_entity(
            world,
            self.level.door.position,
            "door",
            DOOR_COLOR,
            Body::fixed(DOOR_HALF_EXTENTS),
        );
        let player_id = Self::spawn_entity(
            world,
            self.level.player_spawn,
            "player",
            PLAYER_COLOR,
            Body::dynamic(PLAYER_HALF_EXTENTS),
        );

        let mut player = Player::new(player_id, self.level.player_spawn, self.bus.clone());
        player.set_spawner(Box::new(AttackHitboxes));
        let door = Door::new(door_id, self.level.door.position);
        let mut encounter = Encounter::new(self.bus.clone(), player, door);

        for placement in &self.level.boxes {
            let id = Self::spawn_entity(
                world,
                placement.position,
                "box",
                BOX_COLOR,
                Body::fixed(BOX_HALF_EXTENTS),
            );
            let loot = LootBox::new(id, placement.position, placement.content.clone());
            debug!(box_id = id.0, content = loot.content(), "box_placed");
            encounter.add_box(loot);
        }
        for placement in &self.level.skeletons {
            let id = Self::spawn_entity(
                world,
                placement.position,
                "skeleton",
                SKELETON_COLOR,
                Body::dynamic(SKELETON_HALF_EXTENTS),
            );
            let seed = self.seeds.random::<u64>();
            encounter.add_skeleton(Skeleton::new(id, placement.position, seed));
        }

        world.apply_pending();
        for object in encounter.objects() {
            if let Some(entity) = world.find_entity_mut(object.id) {
                object.push_to(entity);
            }
        }

        let camera = world.camera_mut();
        camera.set_zoom_clamped(if self.debug {
            DEBUG_CAMERA_ZOOM
        } else {
            CAMERA_ZOOM
        });
        camera.position = self.level.player_spawn;

        info!(
            boxes = encounter.boxes.len(),
            skeletons = encounter.skeletons.len(),
            "dungeon_loaded"
        );
        self.ui = Some(GameUi::attach(self.bus.clone()));
        self.encounter = Some(encounter);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        let Some(encounter) = self.encounter.as_mut() else {
            return SceneCommand::None;
        };
        let delta_ms = fixed_dt_seconds * 1000.0;

        match encounter.state() {
            GameState::Running => {}
            GameState::LevelComplete | GameState::GameOver if input.restart_pressed() => {
                info!(state = ?encounter.state(), "restart_requested");
                return SceneCommand::HardReset;
            }
            GameState::LevelComplete => return SceneCommand::None,
            GameState::GameOver => {}
        }

        if input.attack_pressed() {
            if let Some(cursor) = input.cursor_position_px() {
                let target = screen_to_world_px(world.camera(), input.window_size(), cursor);
                if let Err(err) = encounter.trigger_attack(world, target) {
                    error!(error = %err, "player_attack_failed");
                    return SceneCommand::Quit;
                }
            }
        }

        encounter.player.advance_time(delta_ms);
        encounter.player.update(
            &PlayerInput::from_snapshot(input),
            delta_ms,
            &mut encounter.boxes,
        );

        for id in encounter.tick(delta_ms) {
            world.despawn(id);
        }
        for object in encounter.objects() {
            if let Some(entity) = world.find_entity_mut(object.id) {
                object.push_to(entity);
            }
        }
        world.apply_pending();

        let report = world.step_physics(fixed_dt_seconds);
        for object in encounter.objects_mut() {
            if let Some(entity) = world.find_entity(object.id) {
                object.pull_from(entity);
            }
        }
        for id in report.tile_contacts {
            encounter.on_tile_contact(id);
        }
        for contact in report.contacts {
            encounter.on_contact(contact.a, contact.b);
        }

        world
            .camera_mut()
            .follow(encounter.player.object.position, CAMERA_LERP);
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        if let Some(mut encounter) = self.encounter.take() {
            encounter.teardown();
        }
        if let Some(mut ui) = self.ui.take() {
            ui.detach();
        }
        info!("dungeon_unloaded");
    }

    fn hud(&self, _world: &SceneWorld) -> Option<HudView> {
        let ui = self.ui.as_ref()?;
        let debug_lines = match (&self.encounter, self.debug) {
            (Some(encounter), true) => self.debug_lines(encounter),
            _ => Vec::new(),
        };
        Some(HudView {
            hearts: ui.hearts(),
            banner: ui.banner(),
            debug_lines,
            show_bodies: self.debug,
        })
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let encounter = self.encounter.as_ref()?;
        Some(format!(
            "Dungeon | hp {} | {:?}",
            encounter.player.health(),
            encounter.state()
        ))
    }
}
