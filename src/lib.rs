//! Slingshot simulation core
//!
//! The rules of a projectile-destruction game on top of Bevy and Rapier2D:
//! a drag-and-release launcher, five kinds of bird with one-shot abilities,
//! destructible blocks and targets, and a round controller that sequences
//! birds and decides win or loss.  Rendering, input devices and persistence
//! live outside this crate; they talk to it through messages
//! ([`round::LauncherInput`], [`round::RoundRequest`]) and read the
//! [`round::Round`] resource.
//!
//! ## Tick order
//!
//! Rapier steps in `PostUpdate`.  In `Update`, [`SlingshotPlugin`] runs:
//!
//! 1. [`SlingshotSet::Tick`]: bump the tick, fire due scheduled actions.
//! 2. [`SlingshotSet::Collisions`]: route last step's collision batch.
//! 3. [`SlingshotSet::Destructibles`]: score and remove destroyed bodies.
//! 4. [`SlingshotSet::Birds`]: abilities, eggs, settle tracking, kill plane.
//! 5. [`SlingshotSet::Launcher`]: pointer input, launches, pouch position.
//! 6. [`SlingshotSet::Round`]: polls, then level (re)starts.
//!
//! In `PostUpdate`, ahead of the Rapier step, every body's velocity is
//! snapshotted into [`physics::PreStepVelocity`] for the next dispatch.

pub mod ability;
pub mod autoplay;
pub mod bird;
pub mod collision;
pub mod config;
pub mod constants;
pub mod destructible;
pub mod error;
pub mod launcher;
pub mod level;
pub mod physics;
pub mod round;
pub mod schedule;

use bevy::prelude::*;
use bevy_rapier2d::prelude::{CollisionEvent, PhysicsSet};

/// Ordered stages of one simulation tick.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum SlingshotSet {
    Tick,
    Collisions,
    Destructibles,
    Birds,
    Launcher,
    Round,
}

/// Registers resources, messages and systems of the simulation core.
///
/// Does not load files and does not add Rapier; the binary does both.
pub struct SlingshotPlugin;

impl Plugin for SlingshotPlugin {
    fn build(&self, app: &mut App) {
        use round::round_playing;

        app.init_resource::<config::GameConfig>()
            .init_resource::<level::LevelCatalog>()
            .init_resource::<schedule::SimTick>()
            .init_resource::<schedule::TickScheduler>()
            .init_resource::<physics::SplitFamilies>()
            .init_resource::<round::Round>()
            .add_message::<CollisionEvent>()
            .add_message::<ability::AbilityRequested>()
            .add_message::<destructible::ObstacleDestroyed>()
            .add_message::<destructible::TargetDestroyed>()
            .add_message::<round::RoundRequest>()
            .add_message::<round::LauncherInput>()
            .add_message::<round::RoundPollDue>()
            .add_message::<round::LevelCompleted>()
            .add_message::<round::GameOver>()
            .configure_sets(
                Update,
                (
                    SlingshotSet::Tick,
                    SlingshotSet::Collisions,
                    SlingshotSet::Destructibles,
                    SlingshotSet::Birds,
                    SlingshotSet::Launcher,
                    SlingshotSet::Round,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    schedule::advance_tick_system.in_set(SlingshotSet::Tick),
                    collision::collision_dispatch_system
                        .in_set(SlingshotSet::Collisions)
                        .run_if(round_playing),
                    destructible::destructible_housekeeping_system
                        .in_set(SlingshotSet::Destructibles)
                        .run_if(round_playing),
                    (
                        ability::ability_activation_system,
                        ability::egg_detonation_system,
                        bird::bird_settle_system,
                        bird::bird_cull_system,
                    )
                        .chain()
                        .in_set(SlingshotSet::Birds)
                        .run_if(round_playing),
                    (
                        round::launcher_input_system,
                        launcher::launcher_visual_system,
                    )
                        .chain()
                        .in_set(SlingshotSet::Launcher),
                    (
                        round::round_poll_system.run_if(round_playing),
                        round::round_request_system,
                    )
                        .chain()
                        .in_set(SlingshotSet::Round),
                ),
            )
            .add_systems(
                PostUpdate,
                physics::snapshot_pre_step_velocity_system.before(PhysicsSet::StepSimulation),
            );
    }
}
