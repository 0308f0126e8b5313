//! Birds: the player-launched projectiles and their lifecycle state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! Queued ──make_ready──▶ Ready ──launch──▶ Launched ──(ability / impacts)──▶ …
//!                                              │
//!                                              └─ detonation / kill plane ──▶ Destroyed
//! ```
//!
//! A launched bird is never removed for being still: once it settles it stays
//! in the world as one more obstacle until the round resets.  "Settled" is
//! derived from a debounce counter of consecutive slow ticks, not stored as a
//! phase, because a settled bird that gets knocked again simply starts
//! counting from zero.
//!
//! ## Kinds
//!
//! | Kind     | Ability                                  | Auto on impact |
//! |----------|------------------------------------------|----------------|
//! | `Red`    | shockwave (area impulse)                 | no             |
//! | `Blue`   | split into three                         | no             |
//! | `Yellow` | speed boost, flattened arc               | no             |
//! | `White`  | drop an exploding egg, parent lifts off  | no             |
//! | `Black`  | detonate, removing itself                | yes            |
//!
//! Body sizes and masses per kind come from [`GameConfig::bird`].

use crate::config::GameConfig;
use crate::physics::{dynamic_body, inert_groups, outside_world};
use crate::round::RoundEntity;
use crate::schedule::TickScheduler;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Z layer birds are drawn on by whatever renders the world.
pub const BIRD_Z: f32 = 0.3;

/// The five projectile variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BirdKind {
    Red,
    Blue,
    Yellow,
    White,
    Black,
}

/// The single effect each kind owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    Shockwave,
    Split,
    Boost,
    EggDrop,
    Detonate,
}

impl BirdKind {
    pub const ALL: [BirdKind; 5] = [
        BirdKind::Red,
        BirdKind::Blue,
        BirdKind::Yellow,
        BirdKind::White,
        BirdKind::Black,
    ];

    pub fn ability(self) -> Ability {
        match self {
            BirdKind::Red => Ability::Shockwave,
            BirdKind::Blue => Ability::Split,
            BirdKind::Yellow => Ability::Boost,
            BirdKind::White => Ability::EggDrop,
            BirdKind::Black => Ability::Detonate,
        }
    }

    /// Kinds whose ability is the impact reaction itself.
    pub fn detonates_on_impact(self) -> bool {
        matches!(self, BirdKind::Black)
    }

    pub fn name(self) -> &'static str {
        match self {
            BirdKind::Red => "red",
            BirdKind::Blue => "blue",
            BirdKind::Yellow => "yellow",
            BirdKind::White => "white",
            BirdKind::Black => "black",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirdPhase {
    /// Waiting in line; collision-disabled.
    Queued,
    /// In the pouch, following the drag point.
    Ready,
    Launched,
    /// Terminal; every operation is a no-op.
    Destroyed,
}

/// What a collision meant for the bird.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionReaction {
    /// Not in flight (or destroyed); nothing recorded.
    Ignored,
    /// First contact since launch.
    FirstContact,
    /// First contact, and the kind detonates on impact: schedule the ability.
    ScheduleDetonation,
    /// Already collided before.
    Repeat,
}

/// Per-bird state.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Bird {
    kind: BirdKind,
    phase: BirdPhase,
    ability_used: bool,
    ability_pending: bool,
    collided: bool,
    settle_ticks: u32,
    split_child: bool,
}

impl Bird {
    pub fn queued(kind: BirdKind) -> Self {
        Self {
            kind,
            phase: BirdPhase::Queued,
            ability_used: false,
            ability_pending: false,
            collided: false,
            settle_ticks: 0,
            split_child: false,
        }
    }

    pub fn ready(kind: BirdKind) -> Self {
        Self {
            phase: BirdPhase::Ready,
            ..Self::queued(kind)
        }
    }

    /// A child spawned by a split: already in flight, ability spent.
    pub fn split_child(kind: BirdKind) -> Self {
        Self {
            phase: BirdPhase::Launched,
            ability_used: true,
            split_child: true,
            ..Self::queued(kind)
        }
    }

    pub fn kind(&self) -> BirdKind {
        self.kind
    }

    pub fn phase(&self) -> BirdPhase {
        self.phase
    }

    pub fn is_launched(&self) -> bool {
        self.phase == BirdPhase::Launched
    }

    pub fn ability_used(&self) -> bool {
        self.ability_used
    }

    pub fn ability_pending(&self) -> bool {
        self.ability_pending
    }

    pub fn collided(&self) -> bool {
        self.collided
    }

    pub fn is_split_child(&self) -> bool {
        self.split_child
    }

    pub fn settle_ticks(&self) -> u32 {
        self.settle_ticks
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == BirdPhase::Destroyed
    }

    /// Queued → Ready.  Returns `false` from any other phase.
    pub fn make_ready(&mut self) -> bool {
        if self.phase != BirdPhase::Queued {
            return false;
        }
        self.phase = BirdPhase::Ready;
        true
    }

    /// Ready → Launched.  Returns `false` from any other phase.
    pub fn launch(&mut self) -> bool {
        if self.phase != BirdPhase::Ready {
            return false;
        }
        self.phase = BirdPhase::Launched;
        true
    }

    /// Record a contact reported by the physics world.
    pub fn observe_collision(&mut self) -> CollisionReaction {
        if self.phase != BirdPhase::Launched {
            return CollisionReaction::Ignored;
        }
        if self.collided {
            return CollisionReaction::Repeat;
        }
        self.collided = true;
        if self.kind.detonates_on_impact() && !self.ability_used && !self.ability_pending {
            self.ability_pending = true;
            CollisionReaction::ScheduleDetonation
        } else {
            CollisionReaction::FirstContact
        }
    }

    /// Gate for [`Bird::activate_ability`].
    pub fn can_activate_ability(&self) -> bool {
        self.phase == BirdPhase::Launched
            && !self.ability_used
            && (!self.collided || self.kind.detonates_on_impact())
    }

    /// Consume the ability.  Returns the effect to run, or `None` when the
    /// gate is closed (second call, not launched, already collided, ...).
    pub fn activate_ability(&mut self) -> Option<Ability> {
        if !self.can_activate_ability() {
            return None;
        }
        self.ability_used = true;
        self.ability_pending = false;
        Some(self.kind.ability())
    }

    /// Feed this tick's speed into the settle debounce counter.
    pub fn track_speed(&mut self, speed: f32, settle_speed: f32) {
        if self.phase != BirdPhase::Launched {
            return;
        }
        if speed < settle_speed {
            self.settle_ticks = self.settle_ticks.saturating_add(1);
        } else {
            self.settle_ticks = 0;
        }
    }

    pub fn is_settled(&self, required_ticks: u32) -> bool {
        self.phase == BirdPhase::Launched && self.settle_ticks >= required_ticks
    }

    pub fn mark_destroyed(&mut self) {
        self.ability_pending = false;
        self.phase = BirdPhase::Destroyed;
    }
}

/// Spawn a bird body.  Unlaunched birds are kinematic (gravity exempt, moved
/// by writing their transform) and collide with nothing until launch.
pub fn spawn_bird(
    commands: &mut Commands,
    bird: Bird,
    position: Vec2,
    config: &GameConfig,
) -> Entity {
    let stats = config.bird(bird.kind());
    commands
        .spawn((
            bird,
            RoundEntity,
            Transform::from_translation(position.extend(BIRD_Z)),
            dynamic_body(
                Collider::ball(stats.radius),
                stats.mass,
                stats.restitution,
                stats.friction,
                inert_groups(),
            ),
            Ccd::enabled(),
        ))
        .insert(RigidBody::KinematicPositionBased)
        .id()
}

/// Spawn a bird that is already in flight (split children).
pub fn spawn_flying_bird(
    commands: &mut Commands,
    bird: Bird,
    position: Vec2,
    linvel: Vec2,
    groups: CollisionGroups,
    config: &GameConfig,
) -> Entity {
    let stats = config.bird(bird.kind());
    commands
        .spawn((
            bird,
            RoundEntity,
            Transform::from_translation(position.extend(BIRD_Z)),
            dynamic_body(
                Collider::ball(stats.radius),
                stats.mass,
                stats.restitution,
                stats.friction,
                groups,
            ),
            Ccd::enabled(),
        ))
        .insert(Velocity::linear(linvel))
        .id()
}

/// Feed every launched bird's speed into its settle counter.
pub fn bird_settle_system(config: Res<GameConfig>, mut q_birds: Query<(&mut Bird, &Velocity)>) {
    for (mut bird, velocity) in q_birds.iter_mut() {
        bird.track_speed(velocity.linvel.length(), config.settle_speed);
    }
}

/// Remove launched birds that have left the world.  The round poll sees the
/// missing body and moves on.
pub fn bird_cull_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut scheduler: ResMut<TickScheduler>,
    mut q_birds: Query<(Entity, &mut Bird, &Transform)>,
) {
    for (entity, mut bird, transform) in q_birds.iter_mut() {
        if bird.phase() != BirdPhase::Launched {
            continue;
        }
        if outside_world(transform.translation.truncate(), &config) {
            debug!("Bird {:?} left the world; removing", entity);
            bird.mark_destroyed();
            scheduler.cancel_for(entity);
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launched(kind: BirdKind) -> Bird {
        let mut bird = Bird::ready(kind);
        assert!(bird.launch());
        bird
    }

    #[test]
    fn names_round_trip_and_reject_unknown() {
        for kind in BirdKind::ALL {
            assert_eq!(BirdKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BirdKind::from_name(" Black "), Some(BirdKind::Black));
        assert_eq!(BirdKind::from_name("green"), None);
    }

    #[test]
    fn blue_is_the_lightest_kind() {
        let config = GameConfig::default();
        let blue = config.bird(BirdKind::Blue).mass;
        assert!(BirdKind::ALL
            .iter()
            .filter(|k| **k != BirdKind::Blue)
            .all(|k| config.bird(*k).mass > blue));
    }

    #[test]
    fn queued_bird_must_be_readied_before_launch() {
        let mut bird = Bird::queued(BirdKind::Red);
        assert!(!bird.launch());
        assert!(bird.make_ready());
        assert!(!bird.make_ready());
        assert!(bird.launch());
        assert!(!bird.launch());
        assert_eq!(bird.phase(), BirdPhase::Launched);
    }

    #[test]
    fn ability_requires_launch() {
        let mut bird = Bird::ready(BirdKind::Yellow);
        assert_eq!(bird.activate_ability(), None);
        assert!(!bird.ability_used());
    }

    #[test]
    fn ability_is_one_shot() {
        let mut bird = launched(BirdKind::Blue);
        assert_eq!(bird.activate_ability(), Some(Ability::Split));
        assert!(bird.ability_used());
        assert_eq!(bird.activate_ability(), None);
        assert!(bird.ability_used(), "ability_used never reverts");
    }

    #[test]
    fn collision_before_launch_is_not_recorded() {
        let mut bird = Bird::ready(BirdKind::Red);
        assert_eq!(bird.observe_collision(), CollisionReaction::Ignored);
        assert!(!bird.collided());
    }

    #[test]
    fn collided_bird_loses_its_ability() {
        let mut bird = launched(BirdKind::Red);
        assert_eq!(bird.observe_collision(), CollisionReaction::FirstContact);
        assert_eq!(bird.observe_collision(), CollisionReaction::Repeat);
        assert_eq!(bird.activate_ability(), None);
    }

    #[test]
    fn black_bird_schedules_exactly_one_detonation() {
        let mut bird = launched(BirdKind::Black);
        assert_eq!(bird.observe_collision(), CollisionReaction::ScheduleDetonation);
        assert!(bird.ability_pending());
        assert_eq!(bird.observe_collision(), CollisionReaction::Repeat);
        // The impact gate stays open for the detonating kind.
        assert_eq!(bird.activate_ability(), Some(Ability::Detonate));
        assert!(!bird.ability_pending());
        assert_eq!(bird.activate_ability(), None);
    }

    #[test]
    fn black_bird_detonated_manually_does_not_reschedule() {
        let mut bird = launched(BirdKind::Black);
        assert_eq!(bird.activate_ability(), Some(Ability::Detonate));
        assert_eq!(bird.observe_collision(), CollisionReaction::FirstContact);
        assert!(!bird.ability_pending());
    }

    #[test]
    fn settle_counter_resets_when_speed_rises() {
        let mut bird = launched(BirdKind::Red);
        for _ in 0..10 {
            bird.track_speed(1.0, 12.0);
        }
        assert!(!bird.is_settled(11));
        // Bounce apex followed by another fall.
        bird.track_speed(40.0, 12.0);
        assert_eq!(bird.settle_ticks(), 0);
        for _ in 0..11 {
            bird.track_speed(0.0, 12.0);
        }
        assert!(bird.is_settled(11));
    }

    #[test]
    fn unlaunched_bird_never_settles() {
        let mut bird = Bird::ready(BirdKind::Red);
        for _ in 0..100 {
            bird.track_speed(0.0, 12.0);
        }
        assert!(!bird.is_settled(1));
    }

    #[test]
    fn destroyed_bird_ignores_everything() {
        let mut bird = launched(BirdKind::Black);
        bird.mark_destroyed();
        let snapshot = bird.clone();
        assert_eq!(bird.observe_collision(), CollisionReaction::Ignored);
        assert_eq!(bird.activate_ability(), None);
        bird.track_speed(0.0, 12.0);
        assert!(!bird.launch());
        assert_eq!(bird, snapshot);
    }

    #[test]
    fn split_children_cannot_split_again() {
        let mut child = Bird::split_child(BirdKind::Blue);
        assert!(child.is_launched());
        assert!(child.is_split_child());
        assert_eq!(child.activate_ability(), None);
    }
}
