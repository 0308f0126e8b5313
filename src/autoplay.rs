//! Headless autoplay driver for the `slingshot` binary.
//!
//! Plays every level in the catalog through the same message surface a real
//! front end would use: drags the launcher to a jittered ~45° shot, fires the
//! ability partway through the flight, advances on a win and retries a lost
//! level once before moving on.  When the last level is decided it logs a
//! summary and exits the app.

use crate::bird::BirdPhase;
use crate::level::LevelCatalog;
use crate::round::{GameOver, LauncherInput, LevelCompleted, Round, RoundPhase, RoundRequest};
use crate::schedule::SimTick;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ticks to wait with a bird in the pouch before pulling.
const AIM_DELAY_TICKS: u64 = 20;
/// Base launch angle above the horizontal.
const AIM_ANGLE: f32 = std::f32::consts::FRAC_PI_4;
const AIM_JITTER: f32 = 0.14;
const ABILITY_DELAY_TICKS: u64 = 35;
const RETRIES_PER_LEVEL: u32 = 1;

/// Result of one level attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelResult {
    pub level: usize,
    pub won: bool,
    pub score: u32,
    pub stars: u8,
}

#[derive(Resource)]
pub struct Autoplay {
    rng: StdRng,
    first_level: usize,
    retries_left: u32,
    aim_at: Option<(Entity, u64)>,
    ability_at: Option<u64>,
    results: Vec<LevelResult>,
}

impl Autoplay {
    pub fn new(first_level: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            first_level,
            retries_left: RETRIES_PER_LEVEL,
            aim_at: None,
            ability_at: None,
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[LevelResult] {
        &self.results
    }

    fn reset_turn(&mut self) {
        self.aim_at = None;
        self.ability_at = None;
    }
}

/// Drag point for a shot at `angle` (radians above +x) pulled to
/// `pull_fraction` of the maximum stretch.
pub fn aim_point(resting: Vec2, max_stretch: f32, angle: f32, pull_fraction: f32) -> Vec2 {
    resting - Vec2::from_angle(angle) * max_stretch * pull_fraction.clamp(0.0, 1.0)
}

/// Startup system: request the first level.
pub fn start_autoplay(autoplay: Res<Autoplay>, mut requests: MessageWriter<RoundRequest>) {
    requests.write(RoundRequest::Start(autoplay.first_level));
}

pub fn autoplay_system(
    mut autoplay: ResMut<Autoplay>,
    tick: Res<SimTick>,
    round: Res<Round>,
    catalog: Res<LevelCatalog>,
    q_birds: Query<&crate::bird::Bird>,
    mut completed: MessageReader<LevelCompleted>,
    mut game_over: MessageReader<GameOver>,
    mut inputs: MessageWriter<LauncherInput>,
    mut requests: MessageWriter<RoundRequest>,
    mut exit: MessageWriter<AppExit>,
) {
    let mut next_level = None;

    for won in completed.read() {
        autoplay.results.push(LevelResult {
            level: won.level,
            won: true,
            score: won.score,
            stars: won.stars,
        });
        next_level = Some(won.level + 1);
    }
    for lost in game_over.read() {
        if autoplay.retries_left > 0 {
            autoplay.retries_left -= 1;
            info!("Autoplay retrying level {}", lost.level);
            autoplay.reset_turn();
            requests.write(RoundRequest::Restart);
            continue;
        }
        autoplay.results.push(LevelResult {
            level: lost.level,
            won: false,
            score: lost.score,
            stars: lost.stars,
        });
        next_level = Some(lost.level + 1);
    }

    if let Some(level) = next_level {
        autoplay.reset_turn();
        autoplay.retries_left = RETRIES_PER_LEVEL;
        if level < catalog.len() {
            requests.write(RoundRequest::Start(level));
        } else {
            log_summary(&autoplay.results);
            exit.write(AppExit::Success);
        }
        return;
    }

    if round.phase() != RoundPhase::Playing {
        return;
    }

    if let Some(at) = autoplay.ability_at {
        if tick.0 >= at {
            inputs.write(LauncherInput::ActivateAbility);
            autoplay.ability_at = None;
        }
    }

    let Some(active) = round.active_bird() else {
        return;
    };
    let ready = q_birds
        .get(active)
        .is_ok_and(|bird| bird.phase() == BirdPhase::Ready);
    if !ready {
        return;
    }

    match autoplay.aim_at {
        Some((entity, at)) if entity == active => {
            if tick.0 < at {
                return;
            }
            let launcher = round.launcher();
            let angle = AIM_ANGLE + autoplay.rng.gen_range(-AIM_JITTER..=AIM_JITTER);
            let pull = autoplay.rng.gen_range(0.85..=1.0);
            let point = aim_point(launcher.resting_point(), launcher.max_stretch(), angle, pull);
            inputs.write(LauncherInput::StartDrag(launcher.resting_point()));
            inputs.write(LauncherInput::UpdateDrag(point));
            inputs.write(LauncherInput::Release);
            let ability_delay = ABILITY_DELAY_TICKS + autoplay.rng.gen_range(0..15);
            autoplay.ability_at = Some(tick.0 + ability_delay);
            autoplay.aim_at = None;
            debug!("Autoplay shot at {:.1}° pull {:.2}", angle.to_degrees(), pull);
        }
        _ => {
            autoplay.aim_at = Some((active, tick.0 + AIM_DELAY_TICKS));
        }
    }
}

fn log_summary(results: &[LevelResult]) {
    let won = results.iter().filter(|r| r.won).count();
    let total: u32 = results.iter().map(|r| r.score).sum();
    info!("Autoplay finished: {won}/{} levels won, total score {total}", results.len());
    for r in results {
        info!(
            "  level {}: {} score {} stars {}",
            r.level,
            if r.won { "won " } else { "lost" },
            r.score,
            r.stars
        );
    }
}
