use engine::{EntityId, Vec2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info};

use super::world_object::WorldObject;

pub(crate) const SKELETON_SPEED: f32 = 1.5;
pub(crate) const SKELETON_ATTACK_MS: f32 = 1000.0;
pub(crate) const SKELETON_DEATH_MS: f32 = 2000.0;
pub(crate) const REROLL_INTERVAL_MS: f32 = 5000.0;
/// Draws above this (out of 100) keep the current direction.
const REROLL_KEEP_ABOVE: u32 = 50;

const ANIM_MOVE: &str = "skeleton-move";
const ANIM_ATTACK: &str = "skeleton-attack";
const ANIM_DEATH: &str = "skeleton-death";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Y grows downwards.
    pub(crate) fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }

    fn others(self) -> [Direction; 3] {
        let mut others = [self; 3];
        let mut slot = 0;
        for direction in Self::ALL {
            if direction != self {
                others[slot] = direction;
                slot += 1;
            }
        }
        others
    }
}

/// Periodic reroll schedule plus the random source it draws from.
///
/// Owned by exactly one skeleton and released exactly once; a released timer
/// never fires again.
#[derive(Debug, Clone)]
pub(crate) struct RerollTimer {
    elapsed_ms: f32,
    rng: Pcg32,
    released: bool,
}

impl RerollTimer {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            elapsed_ms: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            released: false,
        }
    }

    /// Number of times the schedule came due during `delta_ms`.
    fn advance(&mut self, delta_ms: f32) -> u32 {
        if self.released {
            return 0;
        }
        self.elapsed_ms += delta_ms;
        let mut fired = 0;
        while self.elapsed_ms >= REROLL_INTERVAL_MS {
            self.elapsed_ms -= REROLL_INTERVAL_MS;
            fired += 1;
        }
        fired
    }

    /// Returns `false` when the timer had already been released.
    fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.released
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkeletonState {
    Move,
    Attack,
    Die,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkeletonTick {
    Alive,
    /// Death finished this tick; the entity must leave the world.
    Destroyed,
}

#[derive(Debug, Clone)]
pub(crate) struct Skeleton {
    pub(crate) object: WorldObject,
    direction: Direction,
    state: SkeletonState,
    state_elapsed_ms: f32,
    state_entered: bool,
    speed: f32,
    timer: RerollTimer,
    destroyed: bool,
}

impl Skeleton {
    pub(crate) fn new(id: EntityId, position: Vec2, seed: u64) -> Self {
        Self {
            object: WorldObject::new(id, position, ANIM_MOVE),
            direction: Direction::Right,
            state: SkeletonState::Move,
            state_elapsed_ms: 0.0,
            state_entered: false,
            speed: SKELETON_SPEED,
            timer: RerollTimer::new(seed),
            destroyed: false,
        }
    }

    pub(crate) fn tick(&mut self, delta_ms: f32) -> SkeletonTick {
        if self.destroyed {
            return SkeletonTick::Destroyed;
        }

        for _ in 0..self.timer.advance(delta_ms) {
            if self.timer.rng.random_range(1..=100) > REROLL_KEEP_ABOVE {
                continue;
            }
            self.reroll_direction();
        }

        match self.state {
            SkeletonState::Attack => {
                if !self.state_entered {
                    self.state_entered = true;
                    self.object.play(ANIM_ATTACK);
                    self.object.velocity = Vec2::ZERO;
                }
                self.state_elapsed_ms += delta_ms;
                if self.state_elapsed_ms >= SKELETON_ATTACK_MS {
                    self.enter(SkeletonState::Move);
                    self.object.play(ANIM_MOVE);
                }
            }
            SkeletonState::Die => {
                if !self.state_entered {
                    self.state_entered = true;
                    self.object.play(ANIM_DEATH);
                    self.object.velocity = Vec2::ZERO;
                    self.object.massless = true;
                }
                self.state_elapsed_ms += delta_ms;
                if self.state_elapsed_ms >= SKELETON_DEATH_MS {
                    self.destroy();
                    return SkeletonTick::Destroyed;
                }
            }
            SkeletonState::Move => {
                self.object.velocity = self.direction.unit() * (self.speed * delta_ms);
                match self.direction {
                    Direction::Left => {
                        self.object.play(ANIM_MOVE);
                        self.object.flip_x = true;
                    }
                    Direction::Right => {
                        self.object.play(ANIM_MOVE);
                        self.object.flip_x = false;
                    }
                    Direction::Up | Direction::Down => {}
                }
            }
        }
        SkeletonTick::Alive
    }

    /// Bumped into a solid tile: pick another direction right away.
    pub(crate) fn on_tile_collision(&mut self) {
        if self.destroyed {
            return;
        }
        self.reroll_direction();
    }

    /// Re-entering while already attacking keeps the running attack timer.
    pub(crate) fn attack(&mut self) {
        if self.state == SkeletonState::Move {
            self.enter(SkeletonState::Attack);
        }
    }

    pub(crate) fn take_damage(&mut self) {
        if self.state != SkeletonState::Die {
            self.enter(SkeletonState::Die);
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.state == SkeletonState::Die
    }

    pub(crate) fn state(&self) -> SkeletonState {
        self.state
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    #[cfg(test)]
    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[cfg(test)]
    pub(crate) fn timer(&self) -> &RerollTimer {
        &self.timer
    }

    /// Releases the reroll timer without the death sequence, for scene teardown.
    pub(crate) fn release(&mut self) {
        self.destroy();
    }

    fn enter(&mut self, state: SkeletonState) {
        self.state = state;
        self.state_elapsed_ms = 0.0;
        self.state_entered = false;
    }

    fn reroll_direction(&mut self) {
        let others = self.direction.others();
        let next = others[self.timer.rng.random_range(0..others.len())];
        debug!(
            skeleton = self.object.id.0,
            from = ?self.direction,
            to = ?next,
            "skeleton_direction_rerolled"
        );
        self.direction = next;
    }

    fn destroy(&mut self) {
        if self.timer.release() {
            info!(skeleton = self.object.id.0, "skeleton_destroyed");
        }
        self.destroyed = true;
        self.object.velocity = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: f32 = 1000.0 / 60.0;

    fn skeleton(seed: u64) -> Skeleton {
        Skeleton::new(EntityId(3), Vec2::new(40.0, 24.0), seed)
    }

    #[test]
    fn moves_right_at_speed_times_delta() {
        let mut skeleton = skeleton(1);
        assert_eq!(skeleton.tick(10.0), SkeletonTick::Alive);
        assert_eq!(skeleton.object.velocity, Vec2::new(15.0, 0.0));
        assert!(!skeleton.object.flip_x);
        assert_eq!(skeleton.object.animation(), ANIM_MOVE);
    }

    #[test]
    fn left_movement_mirrors_sprite() {
        let mut skeleton = skeleton(1);
        skeleton.direction = Direction::Left;
        skeleton.tick(10.0);
        assert_eq!(skeleton.object.velocity, Vec2::new(-15.0, 0.0));
        assert!(skeleton.object.flip_x);
    }

    #[test]
    fn attack_stops_then_reverts_to_move_after_one_second() {
        let mut skeleton = skeleton(1);
        skeleton.tick(TICK_MS);
        skeleton.attack();

        skeleton.tick(500.0);
        assert_eq!(skeleton.state(), SkeletonState::Attack);
        assert_eq!(skeleton.object.velocity, Vec2::ZERO);
        assert_eq!(skeleton.object.animation(), ANIM_ATTACK);

        skeleton.tick(500.0);
        assert_eq!(skeleton.state(), SkeletonState::Move);
        assert_eq!(skeleton.object.animation(), ANIM_MOVE);
    }

    #[test]
    fn repeated_attack_does_not_restart_the_timer() {
        let mut skeleton = skeleton(1);
        skeleton.attack();
        skeleton.tick(600.0);
        skeleton.attack();
        skeleton.tick(400.0);
        assert_eq!(skeleton.state(), SkeletonState::Move);
    }

    #[test]
    fn take_damage_wins_from_move_and_attack() {
        let mut moving = skeleton(1);
        moving.take_damage();
        assert!(moving.is_dead());

        let mut attacking = skeleton(1);
        attacking.attack();
        attacking.tick(700.0);
        attacking.take_damage();
        assert!(attacking.is_dead());
        attacking.tick(TICK_MS);
        assert_eq!(attacking.object.animation(), ANIM_DEATH);
        assert!(attacking.object.massless);
        assert_eq!(attacking.object.velocity, Vec2::ZERO);
    }

    #[test]
    fn dead_skeleton_ignores_attack() {
        let mut skeleton = skeleton(1);
        skeleton.take_damage();
        skeleton.attack();
        assert_eq!(skeleton.state(), SkeletonState::Die);
    }

    #[test]
    fn death_destroys_after_two_seconds_and_releases_timer() {
        let mut skeleton = skeleton(1);
        skeleton.take_damage();

        assert_eq!(skeleton.tick(1000.0), SkeletonTick::Alive);
        assert!(!skeleton.timer().is_released());
        assert_eq!(skeleton.tick(1000.0), SkeletonTick::Destroyed);
        assert!(skeleton.is_destroyed());
        assert!(skeleton.timer().is_released());

        let direction = skeleton.direction();
        assert_eq!(skeleton.tick(REROLL_INTERVAL_MS * 4.0), SkeletonTick::Destroyed);
        skeleton.on_tile_collision();
        assert_eq!(skeleton.direction(), direction);
    }

    #[test]
    fn timer_release_happens_once() {
        let mut timer = RerollTimer::new(9);
        assert!(timer.release());
        assert!(!timer.release());
        assert_eq!(timer.advance(REROLL_INTERVAL_MS * 2.0), 0);
    }

    #[test]
    fn timer_fires_once_per_interval() {
        let mut timer = RerollTimer::new(9);
        assert_eq!(timer.advance(REROLL_INTERVAL_MS - 1.0), 0);
        assert_eq!(timer.advance(1.0), 1);
        assert_eq!(timer.advance(REROLL_INTERVAL_MS * 3.0), 3);
    }

    #[test]
    fn tile_collision_always_picks_a_different_direction() {
        let mut skeleton = skeleton(42);
        for _ in 0..50 {
            let before = skeleton.direction();
            skeleton.on_tile_collision();
            assert_ne!(skeleton.direction(), before);
        }
    }

    #[test]
    fn others_excludes_current_direction() {
        for direction in Direction::ALL {
            let others = direction.others();
            assert!(!others.contains(&direction));
            assert_eq!(others.len(), 3);
        }
    }

    #[test]
    fn seeded_reroll_sequence_is_reproducible() {
        fn directions(seed: u64) -> Vec<Direction> {
            let mut skeleton = skeleton(seed);
            (0..100)
                .map(|_| {
                    skeleton.tick(REROLL_INTERVAL_MS);
                    skeleton.direction()
                })
                .collect()
        }

        let first = directions(2024);
        assert_eq!(first, directions(2024));

        let changes = first.windows(2).filter(|pair| pair[0] != pair[1]).count();
        let keeps = first.windows(2).filter(|pair| pair[0] == pair[1]).count();
        assert!(changes > 0, "some draws should reroll");
        assert!(keeps > 0, "some draws should keep the direction");
    }
}
