//! Runtime gameplay configuration loaded from `assets/game.toml`.
//!
//! [`GameConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_game_config`] reads
//! `assets/game.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the constants you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<GameConfig>` to any system parameter list and read values
//! with `config.max_stretch`, `config.turn_timeout_ticks`, etc.  Modules that
//! want a narrower view use the grouped accessors ([`GameConfig::damage`],
//! [`GameConfig::abilities`]) which copy the relevant fields into small
//! plain structs that pure functions can take by reference.
//!
//! Per-tier tables (`[birds.red]`, `[materials.wood]`, `[targets.small]`)
//! replace a whole tier at a time, so an overriding entry must list every
//! field of that tier.
//!
//! The timestep and Rapier length scale are fixed when the app is built and
//! therefore stay compile-time constants ([`FIXED_DT`], [`PIXELS_PER_METER`]).
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `GameConfig::default()`.

use crate::bird::BirdKind;
use crate::constants::*;
use crate::destructible::{Material, TargetSize};
use crate::error::{validate_positive, validate_unit_interval, SlingshotResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Runtime-tunable physics and gameplay configuration.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // ── World ────────────────────────────────────────────────────────────────
    pub world_width: f32,
    pub world_height: f32,
    pub gravity: f32,
    pub kill_margin: f32,

    // ── Launcher ─────────────────────────────────────────────────────────────
    pub launcher_anchor_x: f32,
    pub launcher_anchor_y: f32,
    pub launcher_sag: f32,
    pub max_stretch: f32,
    pub force_multiplier: f32,
    pub queue_spacing: f32,

    // ── Trajectory Preview ───────────────────────────────────────────────────
    pub trajectory_points: usize,
    pub trajectory_step: f32,
    pub trajectory_decay: f32,
    pub trajectory_max_arc: f32,

    // ── Bird Lifecycle ───────────────────────────────────────────────────────
    pub settle_speed: f32,
    pub settle_ticks: u32,
    pub auto_detonate_delay_ticks: u64,
    pub launch_cooldown_ticks: u64,

    // ── Abilities ────────────────────────────────────────────────────────────
    pub shockwave_radius: f32,
    pub shockwave_force: f32,
    pub split_angle: f32,
    pub boost_factor: f32,
    pub boost_vertical_bias: f32,
    pub egg_horizontal_fraction: f32,
    pub egg_parent_lift: f32,
    pub egg_radius: f32,
    pub egg_mass: f32,
    pub egg_restitution: f32,
    pub egg_friction: f32,
    pub egg_blast_radius: f32,
    pub egg_blast_force: f32,
    pub detonation_radius: f32,
    pub detonation_force: f32,

    // ── Damage ───────────────────────────────────────────────────────────────
    pub min_impact_speed: f32,
    pub damage_debounce_ticks: u64,
    pub bird_damage_bonus: f32,

    // ── Round ────────────────────────────────────────────────────────────────
    pub poll_interval_ticks: u64,
    pub turn_timeout_ticks: u64,
    pub unused_bird_bonus: u32,

    // ── Tiers ────────────────────────────────────────────────────────────────
    pub birds: BirdTable,
    pub materials: MaterialTable,
    pub targets: TargetTable,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            // World
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            gravity: GRAVITY,
            kill_margin: KILL_MARGIN,
            // Launcher
            launcher_anchor_x: LAUNCHER_ANCHOR_X,
            launcher_anchor_y: LAUNCHER_ANCHOR_Y,
            launcher_sag: LAUNCHER_SAG,
            max_stretch: MAX_STRETCH,
            force_multiplier: FORCE_MULTIPLIER,
            queue_spacing: QUEUE_SPACING,
            // Trajectory Preview
            trajectory_points: TRAJECTORY_POINTS,
            trajectory_step: TRAJECTORY_STEP,
            trajectory_decay: TRAJECTORY_DECAY,
            trajectory_max_arc: TRAJECTORY_MAX_ARC,
            // Bird Lifecycle
            settle_speed: SETTLE_SPEED,
            settle_ticks: SETTLE_TICKS,
            auto_detonate_delay_ticks: AUTO_DETONATE_DELAY_TICKS,
            launch_cooldown_ticks: LAUNCH_COOLDOWN_TICKS,
            // Abilities
            shockwave_radius: SHOCKWAVE_RADIUS,
            shockwave_force: SHOCKWAVE_FORCE,
            split_angle: SPLIT_ANGLE,
            boost_factor: BOOST_FACTOR,
            boost_vertical_bias: BOOST_VERTICAL_BIAS,
            egg_horizontal_fraction: EGG_HORIZONTAL_FRACTION,
            egg_parent_lift: EGG_PARENT_LIFT,
            egg_radius: EGG_RADIUS,
            egg_mass: EGG_MASS,
            egg_restitution: EGG_RESTITUTION,
            egg_friction: EGG_FRICTION,
            egg_blast_radius: EGG_BLAST_RADIUS,
            egg_blast_force: EGG_BLAST_FORCE,
            detonation_radius: DETONATION_RADIUS,
            detonation_force: DETONATION_FORCE,
            // Damage
            min_impact_speed: MIN_IMPACT_SPEED,
            damage_debounce_ticks: DAMAGE_DEBOUNCE_TICKS,
            bird_damage_bonus: BIRD_DAMAGE_BONUS,
            // Round
            poll_interval_ticks: POLL_INTERVAL_TICKS,
            turn_timeout_ticks: TURN_TIMEOUT_TICKS,
            unused_bird_bonus: UNUSED_BIRD_BONUS,
            // Tiers
            birds: BirdTable::default(),
            materials: MaterialTable::default(),
            targets: TargetTable::default(),
        }
    }
}

/// Body properties of one bird kind.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BirdTuning {
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
}

/// Body, health and scoring properties of one block material.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MaterialTuning {
    /// Mass per square world unit.
    pub density: f32,
    pub max_health: f32,
    pub damage_constant: f32,
    pub friction: f32,
    pub restitution: f32,
    pub points: u32,
}

/// Body, health and scoring properties of one target size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TargetTuning {
    pub radius: f32,
    pub mass: f32,
    pub max_health: f32,
    pub damage_constant: f32,
    pub friction: f32,
    pub restitution: f32,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BirdTable {
    pub red: BirdTuning,
    pub blue: BirdTuning,
    pub yellow: BirdTuning,
    pub white: BirdTuning,
    pub black: BirdTuning,
}

impl Default for BirdTable {
    fn default() -> Self {
        Self {
            red: RED_BIRD,
            blue: BLUE_BIRD,
            yellow: YELLOW_BIRD,
            white: WHITE_BIRD,
            black: BLACK_BIRD,
        }
    }
}

impl BirdTable {
    pub fn get(&self, kind: BirdKind) -> BirdTuning {
        match kind {
            BirdKind::Red => self.red,
            BirdKind::Blue => self.blue,
            BirdKind::Yellow => self.yellow,
            BirdKind::White => self.white,
            BirdKind::Black => self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialTable {
    pub wood: MaterialTuning,
    pub stone: MaterialTuning,
    pub ice: MaterialTuning,
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self {
            wood: WOOD,
            stone: STONE,
            ice: ICE,
        }
    }
}

impl MaterialTable {
    pub fn get(&self, material: Material) -> MaterialTuning {
        match material {
            Material::Wood => self.wood,
            Material::Stone => self.stone,
            Material::Ice => self.ice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TargetTable {
    pub small: TargetTuning,
    pub medium: TargetTuning,
    pub large: TargetTuning,
}

impl Default for TargetTable {
    fn default() -> Self {
        Self {
            small: SMALL_TARGET,
            medium: MEDIUM_TARGET,
            large: LARGE_TARGET,
        }
    }
}

impl TargetTable {
    pub fn get(&self, size: TargetSize) -> TargetTuning {
        match size {
            TargetSize::Small => self.small,
            TargetSize::Medium => self.medium,
            TargetSize::Large => self.large,
        }
    }
}

/// Tuning consumed by [`crate::destructible::Destructible::register_impact`].
#[derive(Debug, Clone, Copy)]
pub struct DamageTuning {
    pub min_impact_speed: f32,
    pub debounce_ticks: u64,
    pub bird_bonus: f32,
}

/// Tuning consumed by [`crate::ability::plan_ability`].
#[derive(Debug, Clone, Copy)]
pub struct AbilityTuning {
    pub shockwave_radius: f32,
    pub shockwave_force: f32,
    pub split_angle: f32,
    pub boost_factor: f32,
    pub boost_vertical_bias: f32,
    pub egg_horizontal_fraction: f32,
    pub egg_parent_lift: f32,
    pub egg_blast_radius: f32,
    pub egg_blast_force: f32,
    pub detonation_radius: f32,
    pub detonation_force: f32,
}

impl GameConfig {
    pub fn launcher_anchor(&self) -> Vec2 {
        Vec2::new(self.launcher_anchor_x, self.launcher_anchor_y)
    }

    pub fn bird(&self, kind: BirdKind) -> BirdTuning {
        self.birds.get(kind)
    }

    pub fn material(&self, material: Material) -> MaterialTuning {
        self.materials.get(material)
    }

    pub fn target(&self, size: TargetSize) -> TargetTuning {
        self.targets.get(size)
    }

    pub fn damage(&self) -> DamageTuning {
        DamageTuning {
            min_impact_speed: self.min_impact_speed,
            debounce_ticks: self.damage_debounce_ticks,
            bird_bonus: self.bird_damage_bonus,
        }
    }

    pub fn abilities(&self) -> AbilityTuning {
        AbilityTuning {
            shockwave_radius: self.shockwave_radius,
            shockwave_force: self.shockwave_force,
            split_angle: self.split_angle,
            boost_factor: self.boost_factor,
            boost_vertical_bias: self.boost_vertical_bias,
            egg_horizontal_fraction: self.egg_horizontal_fraction,
            egg_parent_lift: self.egg_parent_lift,
            egg_blast_radius: self.egg_blast_radius,
            egg_blast_force: self.egg_blast_force,
            detonation_radius: self.detonation_radius,
            detonation_force: self.detonation_force,
        }
    }

    /// Reject values that break the simulation outright (non-positive
    /// stretch, a decay factor that amplifies speed, ...).
    pub fn validate(&self) -> SlingshotResult<()> {
        validate_positive("world_width", self.world_width)?;
        validate_positive("world_height", self.world_height)?;
        validate_positive("max_stretch", self.max_stretch)?;
        validate_positive("force_multiplier", self.force_multiplier)?;
        validate_positive("trajectory_step", self.trajectory_step)?;
        validate_unit_interval("trajectory_decay", self.trajectory_decay)?;
        validate_positive("settle_speed", self.settle_speed)?;
        validate_positive("shockwave_radius", self.shockwave_radius)?;
        validate_positive("detonation_radius", self.detonation_radius)?;
        validate_positive("egg_blast_radius", self.egg_blast_radius)?;
        validate_positive("egg_radius", self.egg_radius)?;
        validate_positive("egg_mass", self.egg_mass)?;
        validate_unit_interval("egg_horizontal_fraction", self.egg_horizontal_fraction)?;
        validate_unit_interval("egg_restitution", self.egg_restitution)?;
        for kind in BirdKind::ALL {
            self.bird(kind).validate()?;
        }
        for material in Material::ALL {
            self.material(material).validate()?;
        }
        for size in TargetSize::ALL {
            self.target(size).validate()?;
        }
        Ok(())
    }
}

impl BirdTuning {
    fn validate(&self) -> SlingshotResult<()> {
        validate_positive("birds.radius", self.radius)?;
        validate_positive("birds.mass", self.mass)?;
        validate_unit_interval("birds.restitution", self.restitution)
    }
}

impl MaterialTuning {
    fn validate(&self) -> SlingshotResult<()> {
        validate_positive("materials.density", self.density)?;
        validate_positive("materials.max_health", self.max_health)?;
        validate_positive("materials.damage_constant", self.damage_constant)?;
        validate_unit_interval("materials.restitution", self.restitution)
    }
}

impl TargetTuning {
    fn validate(&self) -> SlingshotResult<()> {
        validate_positive("targets.radius", self.radius)?;
        validate_positive("targets.mass", self.mass)?;
        validate_positive("targets.max_health", self.max_health)?;
        validate_positive("targets.damage_constant", self.damage_constant)?;
        validate_unit_interval("targets.restitution", self.restitution)
    }
}

/// Startup system: attempt to load `assets/game.toml` and overwrite the
/// `GameConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  Parse or validation errors
/// are logged but do not abort the simulation.  A missing file is not an
/// error (defaults are already in place from `init_resource`).
pub fn load_game_config(mut config: ResMut<GameConfig>) {
    let path = "assets/game.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_game_config(&contents) {
            Ok(loaded) => {
                *config = loaded;
                info!("Loaded game config from {path}");
            }
            Err(e) => {
                warn!("Rejected {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            debug!("No {path} found; using compiled defaults");
        }
    }
}

/// Parse and validate a TOML overlay on top of the compiled defaults.
pub fn parse_game_config(contents: &str) -> SlingshotResult<GameConfig> {
    let loaded: GameConfig = toml::from_str(contents)?;
    loaded.validate()?;
    Ok(loaded)
}
