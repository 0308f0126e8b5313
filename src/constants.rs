//! Centralised physics and gameplay constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::GameConfig`] mirrors every value and can override any of
//! them from `assets/game.toml` at startup.
//!
//! ## Tuning guidance
//!
//! The damage and force constants were tuned by playing, not derived.  Treat
//! them as starting points: after editing, run `cargo test` and the headless
//! autoplay binary to confirm levels are still winnable.

use crate::config::{BirdTuning, MaterialTuning, TargetTuning};

// ── Simulation Clock ──────────────────────────────────────────────────────────

/// Fixed physics timestep (seconds).  One tick == one physics step.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Rapier length scale.  Keeps bird/block sizes (10–120 u) inside the range
/// where Rapier's default contact tolerances behave.
pub const PIXELS_PER_METER: f32 = 50.0;

// ── World ─────────────────────────────────────────────────────────────────────

/// Width of the playfield that normalized level coordinates map onto.
pub const WORLD_WIDTH: f32 = 1600.0;

/// Height of the playfield that normalized level coordinates map onto.
pub const WORLD_HEIGHT: f32 = 900.0;

/// Downward gravity (u/s²).
///
/// With `FORCE_MULTIPLIER` × `MAX_STRETCH` = 1000 u/s a 45° shot travels
/// ≈ 1000 u, which reaches the far side of every built-in level.
pub const GRAVITY: f32 = 980.0;

/// Bodies whose centre falls below this y (or strays more than this far past
/// either side of the world) are culled.
pub const KILL_MARGIN: f32 = 400.0;

/// Half-thickness of the static ground slab (its top sits at y = 0).
pub const GROUND_HALF_THICKNESS: f32 = 40.0;

// ── Launcher ──────────────────────────────────────────────────────────────────

/// Slingshot anchor in world space.
pub const LAUNCHER_ANCHOR_X: f32 = 220.0;
pub const LAUNCHER_ANCHOR_Y: f32 = 190.0;

/// Vertical sag of the resting point below the anchor.
pub const LAUNCHER_SAG: f32 = 12.0;

/// Maximum distance the drag point may be pulled from the resting point.
pub const MAX_STRETCH: f32 = 100.0;

/// Launch impulse per unit of stretch.  Maximum launch speed is
/// `MAX_STRETCH * FORCE_MULTIPLIER`.
pub const FORCE_MULTIPLIER: f32 = 10.0;

/// Horizontal spacing of the waiting line of queued birds behind the launcher.
pub const QUEUE_SPACING: f32 = 46.0;

// ── Trajectory Preview ────────────────────────────────────────────────────────

/// Default number of preview dots.
pub const TRAJECTORY_POINTS: usize = 30;

/// Integration step of the preview (seconds).  Coarser than `FIXED_DT` so
/// the dots spread along the arc.
pub const TRAJECTORY_STEP: f32 = 1.0 / 20.0;

/// Per-step velocity retention of the preview (1.0 = no decay).
pub const TRAJECTORY_DECAY: f32 = 1.0;

/// Arc-length budget after which the preview stops (world units).
pub const TRAJECTORY_MAX_ARC: f32 = 1400.0;

// ── Bird Lifecycle ────────────────────────────────────────────────────────────

/// Speed (u/s) under which a launched bird counts as "stopped" for a tick.
pub const SETTLE_SPEED: f32 = 12.0;

/// Consecutive stopped ticks required before a bird is settled.
///
/// Long enough to ride out the zero-velocity instant at a bounce apex.
pub const SETTLE_TICKS: u32 = 45;

/// Ticks between an impact and the deferred auto-detonation.
pub const AUTO_DETONATE_DELAY_TICKS: u64 = 6;

/// Ticks after a launch during which ability input is ignored.
pub const LAUNCH_COOLDOWN_TICKS: u64 = 12;

// ── Abilities ─────────────────────────────────────────────────────────────────

/// Red shockwave radius and centre strength (Δv in u/s at distance 0).
pub const SHOCKWAVE_RADIUS: f32 = 160.0;
pub const SHOCKWAVE_FORCE: f32 = 380.0;

/// Blue split: angular offset of each child from the parent heading (radians).
pub const SPLIT_ANGLE: f32 = 0.26;

/// Yellow boost: speed multiplier and extra damping of the vertical component.
pub const BOOST_FACTOR: f32 = 2.0;
pub const BOOST_VERTICAL_BIAS: f32 = 0.5;

/// White egg: share of horizontal speed the egg inherits, the upward speed
/// the parent is redirected to, and the egg's own blast.
pub const EGG_HORIZONTAL_FRACTION: f32 = 0.3;
pub const EGG_PARENT_LIFT: f32 = 520.0;
pub const EGG_RADIUS: f32 = 9.0;
pub const EGG_MASS: f32 = 0.8;
pub const EGG_RESTITUTION: f32 = 0.1;
pub const EGG_FRICTION: f32 = 0.5;
pub const EGG_BLAST_RADIUS: f32 = 120.0;
pub const EGG_BLAST_FORCE: f32 = 520.0;

/// Black detonation radius and centre strength.
pub const DETONATION_RADIUS: f32 = 230.0;
pub const DETONATION_FORCE: f32 = 720.0;

// ── Damage ────────────────────────────────────────────────────────────────────

/// Relative speeds below this never damage (resting-contact jitter).
pub const MIN_IMPACT_SPEED: f32 = 60.0;

/// Window in which repeated collision starts from the same partner are
/// treated as the same physical impact.
pub const DAMAGE_DEBOUNCE_TICKS: u64 = 6;

/// Multiplier applied when the other body is a player-launched bird.
pub const BIRD_DAMAGE_BONUS: f32 = 2.0;

// ── Round ─────────────────────────────────────────────────────────────────────

/// Ticks between round polls once a bird is in flight.
pub const POLL_INTERVAL_TICKS: u64 = 30;

/// Fallback: a turn ends this many ticks after launch even if the bird
/// never settles.
pub const TURN_TIMEOUT_TICKS: u64 = 600;

/// Score bonus per roster entry left unused on a win.
pub const UNUSED_BIRD_BONUS: u32 = 10_000;

// ── Bird Kinds ────────────────────────────────────────────────────────────────

pub const RED_BIRD: BirdTuning = BirdTuning {
    radius: 16.0,
    mass: 1.0,
    restitution: 0.4,
    friction: 0.5,
};

/// Lightest kind; split children are Blue too.
pub const BLUE_BIRD: BirdTuning = BirdTuning {
    radius: 11.0,
    mass: 0.6,
    restitution: 0.35,
    friction: 0.4,
};

pub const YELLOW_BIRD: BirdTuning = BirdTuning {
    radius: 14.0,
    mass: 0.8,
    restitution: 0.3,
    friction: 0.3,
};

pub const WHITE_BIRD: BirdTuning = BirdTuning {
    radius: 18.0,
    mass: 1.2,
    restitution: 0.3,
    friction: 0.5,
};

pub const BLACK_BIRD: BirdTuning = BirdTuning {
    radius: 20.0,
    mass: 1.6,
    restitution: 0.2,
    friction: 0.6,
};

// ── Block Materials ───────────────────────────────────────────────────────────

/// Soft and sensitive.  Density is mass per square world unit.
pub const WOOD: MaterialTuning = MaterialTuning {
    density: 0.002,
    max_health: 60.0,
    damage_constant: 0.08,
    friction: 0.6,
    restitution: 0.2,
    points: 500,
};

/// Rigid, dead bounce.
pub const STONE: MaterialTuning = MaterialTuning {
    density: 0.005,
    max_health: 150.0,
    damage_constant: 0.03,
    friction: 0.8,
    restitution: 0.05,
    points: 1000,
};

/// Slippery and springy.
pub const ICE: MaterialTuning = MaterialTuning {
    density: 0.0015,
    max_health: 30.0,
    damage_constant: 0.06,
    friction: 0.05,
    restitution: 0.5,
    points: 400,
};

// ── Target Sizes ──────────────────────────────────────────────────────────────

pub const SMALL_TARGET: TargetTuning = TargetTuning {
    radius: 14.0,
    mass: 1.0,
    max_health: 30.0,
    damage_constant: 0.1,
    friction: 0.6,
    restitution: 0.3,
    points: 5000,
};

pub const MEDIUM_TARGET: TargetTuning = TargetTuning {
    radius: 20.0,
    mass: 1.6,
    max_health: 50.0,
    damage_constant: 0.1,
    friction: 0.6,
    restitution: 0.3,
    points: 6000,
};

pub const LARGE_TARGET: TargetTuning = TargetTuning {
    radius: 28.0,
    mass: 2.5,
    max_health: 80.0,
    damage_constant: 0.1,
    friction: 0.6,
    restitution: 0.3,
    points: 8000,
};
