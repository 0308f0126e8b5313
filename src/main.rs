use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use slingshot::autoplay::{autoplay_system, start_autoplay, Autoplay};
use slingshot::config::{load_game_config, GameConfig};
use slingshot::constants::{FIXED_DT, PIXELS_PER_METER};
use slingshot::level::load_level_catalog;
use slingshot::physics::apply_gravity_system;
use slingshot::{SlingshotPlugin, SlingshotSet};
use std::env;
use std::time::Duration;

fn main() {
    // SLINGSHOT_LEVEL=<n> starts the run at level n (0-based).
    let first_level = env::var("SLINGSHOT_LEVEL")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let seed = env::var("SLINGSHOT_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0x5EED);

    let mut app = App::new();

    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f32(
            FIXED_DT,
        ))),
        LogPlugin::default(),
        TransformPlugin,
    ))
    // One Rapier step per frame, regardless of wall-clock jitter, so one
    // frame is exactly one simulation tick.
    .insert_resource(TimestepMode::Fixed {
        dt: FIXED_DT,
        substeps: 1,
    })
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(
        PIXELS_PER_METER,
    ))
    .add_plugins(SlingshotPlugin)
    .insert_resource(Autoplay::new(first_level, seed))
    .add_systems(
        Startup,
        (
            // Load config first so every other startup system sees the final values.
            load_game_config,
            load_level_catalog.after(load_game_config),
            start_autoplay.after(load_level_catalog),
        ),
    )
    .add_systems(
        Update,
        (
            apply_gravity_system.run_if(resource_changed::<GameConfig>),
            autoplay_system.before(SlingshotSet::Tick),
        ),
    );

    info!("Slingshot autoplay starting at level {first_level}");
    app.run();
}
