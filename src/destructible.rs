//! Health-bearing bodies: obstacle blocks and targets.
//!
//! Both share one damage model.  Every collision the dispatcher routes here
//! becomes an [`Impact`]; [`Destructible::register_impact`] turns it into
//! damage, and the body is destroyed once health reaches zero.  Destruction
//! is only *recorded* during dispatch: scoring, messages and despawning happen
//! in [`destructible_housekeeping_system`] on the following pass.
//!
//! ## Tiers
//!
//! Default tier tables live in [`crate::constants`] and are overridable
//! through [`GameConfig`]:
//!
//! | Material | Density | Health | Damage k | Points | Character              |
//! |----------|---------|--------|----------|--------|------------------------|
//! | Wood     | 0.002   | 60     | 0.08     | 500    | soft, sensitive        |
//! | Stone    | 0.005   | 150    | 0.03     | 1000   | rigid, dead bounce     |
//! | Ice      | 0.0015  | 30     | 0.06     | 400    | slippery, springy      |
//!
//! Targets come in three sizes; bigger ones are heavier, tougher and worth more.
//! A [`Destructible`] copies its tier's health, damage constant and points
//! when spawned, so a config reload never rescales bodies already in play.

use crate::config::{DamageTuning, GameConfig, MaterialTuning, TargetTuning};
use crate::physics::{dynamic_body, outside_world, solid_groups, BLOCKS, TARGETS};
use crate::round::{Round, RoundEntity};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Obstacle material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Wood,
    Stone,
    Ice,
}

/// Target size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSize {
    Small,
    Medium,
    Large,
}

/// Health and scoring properties a destructible keeps for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierStats {
    pub max_health: f32,
    pub damage_constant: f32,
    pub points: u32,
}

impl From<MaterialTuning> for TierStats {
    fn from(t: MaterialTuning) -> Self {
        Self {
            max_health: t.max_health,
            damage_constant: t.damage_constant,
            points: t.points,
        }
    }
}

impl From<TargetTuning> for TierStats {
    fn from(t: TargetTuning) -> Self {
        Self {
            max_health: t.max_health,
            damage_constant: t.damage_constant,
            points: t.points,
        }
    }
}

impl Material {
    pub const ALL: [Material; 3] = [Material::Wood, Material::Stone, Material::Ice];

    pub fn name(self) -> &'static str {
        match self {
            Material::Wood => "wood",
            Material::Stone => "stone",
            Material::Ice => "ice",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl TargetSize {
    pub const ALL: [TargetSize; 3] = [TargetSize::Small, TargetSize::Medium, TargetSize::Large];

    pub fn name(self) -> &'static str {
        match self {
            TargetSize::Small => "small",
            TargetSize::Medium => "medium",
            TargetSize::Large => "large",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Obstacle block or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructibleClass {
    Block(Material),
    Target(TargetSize),
}

impl DestructibleClass {
    /// Current tier stats from `config`.
    pub fn stats(self, config: &GameConfig) -> TierStats {
        match self {
            DestructibleClass::Block(m) => config.material(m).into(),
            DestructibleClass::Target(s) => config.target(s).into(),
        }
    }

    pub fn is_target(self) -> bool {
        matches!(self, DestructibleClass::Target(_))
    }
}

/// One collision as seen from the destructible's side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub other: Entity,
    pub relative_speed: f32,
    /// Mass of the other body, or this body's own mass for static partners.
    pub other_mass: f32,
    pub other_is_bird: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactOutcome {
    BelowThreshold,
    /// Same partner already counted within the debounce window.
    Debounced,
    Damaged { damage: f32 },
    Destroyed { damage: f32 },
    AlreadyDestroyed,
}

/// Health state of a block or target.
#[derive(Component, Debug, Clone)]
pub struct Destructible {
    class: DestructibleClass,
    stats: TierStats,
    health: f32,
    destroyed: bool,
    recent_hits: Vec<(Entity, u64)>,
}

impl Destructible {
    pub fn new(class: DestructibleClass, stats: TierStats) -> Self {
        Self {
            class,
            stats,
            health: stats.max_health,
            destroyed: false,
            recent_hits: Vec::new(),
        }
    }

    pub fn from_config(class: DestructibleClass, config: &GameConfig) -> Self {
        Self::new(class, class.stats(config))
    }

    pub fn class(&self) -> DestructibleClass {
        self.class
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.stats.max_health
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn points(&self) -> u32 {
        self.stats.points
    }

    /// Apply one impact at `tick`.
    pub fn register_impact(
        &mut self,
        impact: Impact,
        tick: u64,
        tuning: &DamageTuning,
    ) -> ImpactOutcome {
        if self.destroyed {
            return ImpactOutcome::AlreadyDestroyed;
        }
        if impact.relative_speed < tuning.min_impact_speed {
            return ImpactOutcome::BelowThreshold;
        }

        self.recent_hits
            .retain(|(_, at)| tick.saturating_sub(*at) < tuning.debounce_ticks);
        if self.recent_hits.iter().any(|(e, _)| *e == impact.other) {
            return ImpactOutcome::Debounced;
        }
        self.recent_hits.push((impact.other, tick));

        let mut damage = impact.relative_speed * impact.other_mass * self.stats.damage_constant;
        if impact.other_is_bird {
            damage *= tuning.bird_bonus;
        }
        let damage = damage.max(0.0);

        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 {
            self.destroyed = true;
            ImpactOutcome::Destroyed { damage }
        } else {
            ImpactOutcome::Damaged { damage }
        }
    }

    /// Destroy outright (left the world).
    pub fn destroy(&mut self) {
        self.health = 0.0;
        self.destroyed = true;
    }
}

/// Announced when a block is removed.
#[derive(Message, Debug, Clone, Copy)]
pub struct ObstacleDestroyed {
    pub material: Material,
    pub position: Vec2,
    pub points: u32,
}

/// Announced when a target is removed.
#[derive(Message, Debug, Clone, Copy)]
pub struct TargetDestroyed {
    pub size: TargetSize,
    pub position: Vec2,
    pub points: u32,
}

/// Spawn a rectangular block.  `size` is full width/height in world units,
/// `angle` in radians.
pub fn spawn_block(
    commands: &mut Commands,
    material: Material,
    center: Vec2,
    size: Vec2,
    angle: f32,
    config: &GameConfig,
) -> Entity {
    let tuning = config.material(material);
    let mass = tuning.density * size.x * size.y;
    commands
        .spawn((
            Destructible::new(DestructibleClass::Block(material), tuning.into()),
            RoundEntity,
            Transform::from_translation(center.extend(0.1))
                .with_rotation(Quat::from_rotation_z(angle)),
            dynamic_body(
                Collider::cuboid(size.x / 2.0, size.y / 2.0),
                mass,
                tuning.restitution,
                tuning.friction,
                solid_groups(BLOCKS),
            ),
        ))
        .id()
}

/// Spawn a round target.
pub fn spawn_target(
    commands: &mut Commands,
    size: TargetSize,
    center: Vec2,
    config: &GameConfig,
) -> Entity {
    let tuning = config.target(size);
    commands
        .spawn((
            Destructible::new(DestructibleClass::Target(size), tuning.into()),
            RoundEntity,
            Transform::from_translation(center.extend(0.2)),
            dynamic_body(
                Collider::ball(tuning.radius),
                tuning.mass,
                tuning.restitution,
                tuning.friction,
                solid_groups(TARGETS),
            ),
        ))
        .id()
}

/// Cull bodies that left the world, then score, announce and despawn every
/// destroyed destructible.
pub fn destructible_housekeeping_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut round: ResMut<Round>,
    mut q_destructibles: Query<(Entity, &mut Destructible, &Transform)>,
    mut obstacles: MessageWriter<ObstacleDestroyed>,
    mut targets: MessageWriter<TargetDestroyed>,
) {
    for (entity, mut destructible, transform) in q_destructibles.iter_mut() {
        let position = transform.translation.truncate();
        if !destructible.is_destroyed() && outside_world(position, &config) {
            destructible.destroy();
        }
        if !destructible.is_destroyed() {
            continue;
        }

        let points = destructible.points();
        round.award(points);
        match destructible.class() {
            DestructibleClass::Block(material) => {
                debug!("{} block destroyed (+{points})", material.name());
                obstacles.write(ObstacleDestroyed {
                    material,
                    position,
                    points,
                });
            }
            DestructibleClass::Target(size) => {
                round.record_target_destroyed();
                info!(
                    "{} target destroyed (+{points}), {}/{} down",
                    size.name(),
                    round.targets_destroyed(),
                    round.targets_total()
                );
                targets.write(TargetDestroyed {
                    size,
                    position,
                    points,
                });
            }
        }
        commands.entity(entity).despawn();
    }
}
