//! Shared helpers for the headless round tests.
//!
//! The app is [`MinimalPlugins`] plus [`SlingshotPlugin`] and nothing else:
//! no window, no Rapier step.  Tests drive motion by writing `Velocity`
//! directly and inject contacts as `CollisionEvent` messages, so every run is
//! deterministic and one `app.update()` is exactly one tick.  The stepped
//! Rapier app lives in `tests/physics_flow.rs`.

#![allow(dead_code)]

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;
use slingshot::bird::{Bird, BirdKind};
use slingshot::config::GameConfig;
use slingshot::destructible::{
    Destructible, Material, ObstacleDestroyed, TargetDestroyed, TargetSize,
};
use slingshot::level::{LevelCatalog, LevelDefinition, ObstaclePlacement, TargetPlacement};
use slingshot::physics::PreStepVelocity;
use slingshot::round::{GameOver, LauncherInput, LevelCompleted, Round, RoundRequest};
use slingshot::{SlingshotPlugin, SlingshotSet};

/// Outcome and destruction messages seen so far.
#[derive(Resource, Default)]
pub struct Seen {
    pub completed: Vec<LevelCompleted>,
    pub game_over: Vec<GameOver>,
    pub obstacles: Vec<ObstacleDestroyed>,
    pub targets: Vec<TargetDestroyed>,
}

fn collect_outcomes(
    mut seen: ResMut<Seen>,
    mut completed: MessageReader<LevelCompleted>,
    mut game_over: MessageReader<GameOver>,
    mut obstacles: MessageReader<ObstacleDestroyed>,
    mut targets: MessageReader<TargetDestroyed>,
) {
    seen.completed.extend(completed.read().copied());
    seen.game_over.extend(game_over.read().copied());
    seen.obstacles.extend(obstacles.read().copied());
    seen.targets.extend(targets.read().copied());
}

/// Fast polling, generous timeouts; tests tighten what they exercise.
pub fn test_config() -> GameConfig {
    GameConfig {
        poll_interval_ticks: 10,
        ..GameConfig::default()
    }
}

pub fn level(roster: Vec<BirdKind>) -> LevelDefinition {
    LevelDefinition {
        name: "test".into(),
        roster,
        obstacles: Vec::new(),
        targets: Vec::new(),
        star_thresholds: [1_000, 20_000, 40_000],
    }
}

/// A target standing far from the launcher, out of every blast radius.
pub fn far_target(size: TargetSize) -> TargetPlacement {
    TargetPlacement {
        position: Vec2::new(0.9, 0.03),
        size,
    }
}

pub fn block_at(x: f32, y: f32, material: Material) -> ObstaclePlacement {
    ObstaclePlacement {
        position: Vec2::new(x, y),
        size: Vec2::new(0.0125, 0.1),
        material,
        angle: 0.0,
    }
}

pub fn app_with(level: LevelDefinition, config: GameConfig) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, SlingshotPlugin));
    install_level(&mut app, level, config);
    app
}

/// Insert `config` and a one-level catalog, hook up [`Seen`] and run the
/// first frame.  The app must already carry [`SlingshotPlugin`].
pub fn install_level(app: &mut App, level: LevelDefinition, config: GameConfig) {
    app.insert_resource(config);
    app.insert_resource(LevelCatalog::new(vec![level]));
    app.init_resource::<Seen>();
    app.add_systems(Update, collect_outcomes.after(SlingshotSet::Round));
    app.update();
}

/// Start level 0 and run the frame that builds it.
pub fn start(app: &mut App) {
    app.world_mut().write_message(RoundRequest::Start(0));
    app.update();
}

pub fn round(app: &App) -> &Round {
    app.world().resource::<Round>()
}

pub fn updates(app: &mut App, n: usize) {
    for _ in 0..n {
        app.update();
    }
}

/// Drag from rest by `pull` and release, all within one tick.  Returns the
/// bird that was in the pouch.
pub fn launch(app: &mut App, pull: Vec2) -> Option<Entity> {
    let bird = round(app).active_bird();
    let resting = round(app).launcher().resting_point();
    let world = app.world_mut();
    world.write_message(LauncherInput::StartDrag(resting));
    world.write_message(LauncherInput::UpdateDrag(resting + pull));
    world.write_message(LauncherInput::Release);
    app.update();
    bird
}

/// Launch, then stop the bird by hand so it settles without a physics step.
pub fn launch_still(app: &mut App, pull: Vec2) -> Option<Entity> {
    let bird = launch(app, pull)?;
    set_velocity(app, bird, Vec2::ZERO);
    Some(bird)
}

/// Set a body's velocity as both the current one and the one the last
/// physics step started with.
pub fn set_velocity(app: &mut App, entity: Entity, linvel: Vec2) {
    let world = app.world_mut();
    if let Some(mut velocity) = world.get_mut::<Velocity>(entity) {
        velocity.linvel = linvel;
    }
    if let Some(mut snapshot) = world.get_mut::<PreStepVelocity>(entity) {
        snapshot.0 = linvel;
    }
}

pub fn collide(app: &mut App, a: Entity, b: Entity) {
    app.world_mut()
        .write_message(CollisionEvent::Started(a, b, CollisionEventFlags::empty()));
}

pub fn targets(app: &mut App) -> Vec<Entity> {
    let world = app.world_mut();
    let mut q = world.query::<(Entity, &Destructible)>();
    q.iter(world)
        .filter(|(_, d)| d.class().is_target())
        .map(|(e, _)| e)
        .collect()
}

pub fn blocks(app: &mut App) -> Vec<Entity> {
    let world = app.world_mut();
    let mut q = world.query::<(Entity, &Destructible)>();
    q.iter(world)
        .filter(|(_, d)| !d.class().is_target())
        .map(|(e, _)| e)
        .collect()
}

pub fn birds(app: &mut App) -> Vec<(Entity, Bird)> {
    let world = app.world_mut();
    let mut q = world.query::<(Entity, &Bird)>();
    q.iter(world).map(|(e, b)| (e, b.clone())).collect()
}
