//! Round controller: level setup, bird sequencing, win/loss polling, scoring.
//!
//! ## States
//!
//! ```text
//! Idle ──Start──▶ Playing ──all targets down──▶ LevelComplete
//!                    │   ▲                          │
//!                    │   └──Restart / NextLevel─────┤
//!                    └──roster exhausted──▶ GameOver┘
//! ```
//!
//! [`Round`] owns the bird queue, the launcher and the score.  Entities that
//! belong to a round carry [`RoundEntity`]; a restart despawns all of them,
//! clears the tick scheduler and rebuilds the level from its definition.
//!
//! ## Polling
//!
//! The first launch arms a periodic [`ScheduledAction::PollRound`] that keeps
//! firing every `poll_interval_ticks` until the round ends.  Each poll checks,
//! in order:
//!
//! 1. every target destroyed → `LevelComplete` (unused birds add a bonus
//!    before the star rating is taken);
//! 2. the launched bird settled, or it is destroyed or gone and every
//!    destructible has come to rest, or its turn timed out →
//!    `GameOver` when nothing is left to launch, otherwise the next bird moves
//!    into the pouch and the waiting line shuffles forward.

use crate::ability::{AbilityRequested, AbilitySource};
use crate::bird::{spawn_bird, Bird, BirdKind};
use crate::config::GameConfig;
use crate::destructible::{spawn_block, spawn_target, Destructible};
use crate::launcher::{Launcher, PreviewParams, TrajectoryPreview};
use crate::level::{star_rating, LevelCatalog, LevelDefinition};
use crate::physics::{bird_groups, ground_bundle, SplitFamilies};
use crate::schedule::{ScheduledAction, SimTick, TickScheduler};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use std::collections::VecDeque;

/// Marker for every entity a round reset must remove.
#[derive(Component, Debug, Default)]
pub struct RoundEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Idle,
    Playing,
    LevelComplete,
    GameOver,
}

impl RoundPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundPhase::LevelComplete | RoundPhase::GameOver)
    }
}

/// What a poll decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue,
    LevelComplete,
    GameOver,
    Advance,
}

/// Final numbers of a won round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub score: u32,
    pub stars: u8,
    pub bonus: u32,
}

/// State of the level being played.
#[derive(Resource, Debug)]
pub struct Round {
    phase: RoundPhase,
    level_index: usize,
    level_name: String,
    score: u32,
    roster: Vec<BirdKind>,
    birds_used: usize,
    queue: VecDeque<Entity>,
    active: Option<Entity>,
    targets_total: usize,
    targets_destroyed: usize,
    thresholds: [u32; 3],
    launcher: Launcher,
    ability_ready_tick: u64,
    turn_started_tick: Option<u64>,
}

impl FromWorld for Round {
    fn from_world(world: &mut World) -> Self {
        let launcher = match world.get_resource::<GameConfig>() {
            Some(config) => Launcher::from_config(config),
            None => Launcher::from_config(&GameConfig::default()),
        };
        Self::idle(launcher)
    }
}

impl Round {
    pub fn idle(launcher: Launcher) -> Self {
        Self {
            phase: RoundPhase::Idle,
            level_index: 0,
            level_name: String::new(),
            score: 0,
            roster: Vec::new(),
            birds_used: 0,
            queue: VecDeque::new(),
            active: None,
            targets_total: 0,
            targets_destroyed: 0,
            thresholds: [0; 3],
            launcher,
            ability_ready_tick: 0,
            turn_started_tick: None,
        }
    }

    // ── Read-only surface ────────────────────────────────────────────────────

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn roster(&self) -> &[BirdKind] {
        &self.roster
    }

    /// Roster entries not launched yet, including the bird in the pouch.
    pub fn remaining_birds(&self) -> usize {
        self.roster.len().saturating_sub(self.birds_used)
    }

    pub fn birds_used(&self) -> usize {
        self.birds_used
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn active_bird(&self) -> Option<Entity> {
        self.active
    }

    pub fn queue(&self) -> impl Iterator<Item = Entity> + '_ {
        self.queue.iter().copied()
    }

    pub fn targets_total(&self) -> usize {
        self.targets_total
    }

    pub fn targets_destroyed(&self) -> usize {
        self.targets_destroyed
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut Launcher {
        &mut self.launcher
    }

    /// Aiming guide for the current drag, sized and tuned by `config`.
    pub fn trajectory_preview(&self, config: &GameConfig) -> TrajectoryPreview {
        self.launcher.trajectory_preview(
            config.trajectory_points,
            PreviewParams::from_config(config),
        )
    }

    pub fn turn_started_tick(&self) -> Option<u64> {
        self.turn_started_tick
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Reset everything for `level` and enter `Playing`.
    pub fn begin(
        &mut self,
        level_index: usize,
        level: &LevelDefinition,
        active: Option<Entity>,
        queue: VecDeque<Entity>,
        config: &GameConfig,
    ) {
        *self = Self::idle(Launcher::from_config(config));
        self.phase = RoundPhase::Playing;
        self.level_index = level_index;
        self.level_name = level.name.clone();
        self.roster = level.roster.clone();
        self.thresholds = level.star_thresholds;
        self.targets_total = level.targets.len();
        self.active = active;
        self.queue = queue;
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn record_target_destroyed(&mut self) {
        self.targets_destroyed += 1;
    }

    pub fn all_targets_destroyed(&self) -> bool {
        self.targets_total > 0 && self.targets_destroyed >= self.targets_total
    }

    /// True while another launch is allowed this turn.
    pub fn can_launch(&self) -> bool {
        self.phase == RoundPhase::Playing
            && self.active.is_some()
            && self.turn_started_tick.is_none()
            && self.birds_used < self.roster.len()
    }

    pub fn record_launch(&mut self, tick: u64, cooldown: u64) {
        self.birds_used += 1;
        self.ability_ready_tick = tick.saturating_add(cooldown);
        self.turn_started_tick = Some(tick);
    }

    pub fn ability_ready(&self, tick: u64) -> bool {
        self.phase == RoundPhase::Playing
            && self.turn_started_tick.is_some()
            && tick >= self.ability_ready_tick
    }

    /// Whether the current turn ran past `timeout` ticks.
    pub fn turn_timed_out(&self, tick: u64, timeout: u64) -> bool {
        self.turn_started_tick
            .is_some_and(|started| tick.saturating_sub(started) >= timeout)
    }

    /// Decide the outcome of a poll.  `turn_finished` is the caller's verdict
    /// on the launched bird (settled, destroyed, missing or timed out).
    pub fn decide(&self, turn_finished: bool) -> PollDecision {
        if self.phase != RoundPhase::Playing {
            return PollDecision::Continue;
        }
        if self.all_targets_destroyed() {
            return PollDecision::LevelComplete;
        }
        if !turn_finished || self.turn_started_tick.is_none() {
            return PollDecision::Continue;
        }
        if self.queue.is_empty() && self.birds_used >= self.roster.len() {
            PollDecision::GameOver
        } else {
            PollDecision::Advance
        }
    }

    /// Enter `LevelComplete`, paying the unused-bird bonus.
    pub fn complete(&mut self, bonus_per_bird: u32) -> RoundOutcome {
        let bonus = (self.remaining_birds() as u32).saturating_mul(bonus_per_bird);
        self.award(bonus);
        self.finish(RoundPhase::LevelComplete);
        RoundOutcome {
            score: self.score,
            stars: star_rating(self.score, self.thresholds),
            bonus,
        }
    }

    /// Enter `GameOver`; returns the star rating of the final score.
    pub fn fail(&mut self) -> u8 {
        self.finish(RoundPhase::GameOver);
        star_rating(self.score, self.thresholds)
    }

    fn finish(&mut self, phase: RoundPhase) {
        self.phase = phase;
        self.launcher.cancel();
        self.turn_started_tick = None;
    }

    /// Move the head of the queue into the pouch.
    pub fn advance(&mut self) -> Option<Entity> {
        let next = self.queue.pop_front();
        self.active = next;
        self.turn_started_tick = None;
        self.launcher.cancel();
        next
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Ask the controller to (re)load a level.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundRequest {
    Start(usize),
    Restart,
    NextLevel,
}

/// World-space pointer input for the launcher.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum LauncherInput {
    StartDrag(Vec2),
    UpdateDrag(Vec2),
    Release,
    ActivateAbility,
}

/// Emitted by the tick scheduler when a poll is due.
#[derive(Message, Debug, Clone, Copy)]
pub struct RoundPollDue {
    pub tick: u64,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCompleted {
    pub level: usize,
    pub score: u32,
    pub stars: u8,
    pub bonus: u32,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    pub level: usize,
    pub score: u32,
    pub stars: u8,
}

/// Run condition for gameplay systems.
pub fn round_playing(round: Res<Round>) -> bool {
    round.phase() == RoundPhase::Playing
}

/// Where the `index`-th waiting bird stands.
fn queue_slot(launcher: &Launcher, config: &GameConfig, index: usize, kind: BirdKind) -> Vec2 {
    Vec2::new(
        launcher.resting_point().x - config.queue_spacing * (index as f32 + 1.0),
        config.bird(kind).radius,
    )
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Tear down the current round and build the requested level.
pub fn round_request_system(
    mut commands: Commands,
    mut requests: MessageReader<RoundRequest>,
    config: Res<GameConfig>,
    catalog: Res<LevelCatalog>,
    mut round: ResMut<Round>,
    mut scheduler: ResMut<TickScheduler>,
    mut families: ResMut<SplitFamilies>,
    q_round_entities: Query<Entity, With<RoundEntity>>,
) {
    // Only the latest request in a frame matters.
    let Some(request) = requests.read().last().copied() else {
        return;
    };
    let index = match request {
        RoundRequest::Start(index) => index,
        RoundRequest::Restart => round.level_index(),
        RoundRequest::NextLevel => round.level_index() + 1,
    };
    let level = match catalog.get(index) {
        Ok(level) => level,
        Err(e) => {
            warn!("Ignoring {:?}: {e}", request);
            return;
        }
    };

    for entity in q_round_entities.iter() {
        commands.entity(entity).despawn();
    }
    scheduler.clear();
    families.reset();

    commands.spawn((ground_bundle(&config), RoundEntity));
    for obstacle in &level.obstacles {
        spawn_block(
            &mut commands,
            obstacle.material,
            obstacle.world_center(&config),
            obstacle.world_size(&config),
            obstacle.angle,
            &config,
        );
    }
    for target in &level.targets {
        spawn_target(&mut commands, target.size, target.world_center(&config), &config);
    }

    let launcher = Launcher::from_config(&config);
    let mut active = None;
    let mut queue = VecDeque::with_capacity(level.roster.len());
    for (i, kind) in level.roster.iter().copied().enumerate() {
        if i == 0 {
            let resting = launcher.resting_point();
            active = Some(spawn_bird(&mut commands, Bird::ready(kind), resting, &config));
        } else {
            let slot = queue_slot(&launcher, &config, i - 1, kind);
            queue.push_back(spawn_bird(&mut commands, Bird::queued(kind), slot, &config));
        }
    }

    round.begin(index, level, active, queue, &config);
    info!(
        "Level {} '{}' started: {} birds, {} targets, {} obstacles",
        index,
        level.name,
        level.roster.len(),
        level.targets.len(),
        level.obstacles.len()
    );
}

/// Feed pointer input into the launcher, launch on release and forward
/// ability presses once the launch cooldown has passed.  Input outside
/// `Playing` is dropped.
pub fn launcher_input_system(
    mut commands: Commands,
    mut inputs: MessageReader<LauncherInput>,
    tick: Res<SimTick>,
    config: Res<GameConfig>,
    mut round: ResMut<Round>,
    mut scheduler: ResMut<TickScheduler>,
    mut q_birds: Query<&mut Bird>,
    mut abilities: MessageWriter<AbilityRequested>,
) {
    for input in inputs.read() {
        if round.phase() != RoundPhase::Playing {
            continue;
        }
        match *input {
            LauncherInput::StartDrag(point) => {
                if round.can_launch() {
                    round.launcher_mut().start_drag(point);
                }
            }
            LauncherInput::UpdateDrag(point) => {
                round.launcher_mut().update_drag(point);
            }
            LauncherInput::Release => {
                let Some(impulse) = round.launcher_mut().release() else {
                    continue;
                };
                if !round.can_launch() {
                    continue;
                }
                let Some(active) = round.active_bird() else {
                    continue;
                };
                let Ok(mut bird) = q_birds.get_mut(active) else {
                    continue;
                };
                if !bird.launch() {
                    continue;
                }
                // Rapier drops an impulse queued in the same frame as the
                // kinematic to dynamic switch.  The launcher impulse is the
                // launch speed for every mass, so it goes in as velocity.
                commands.entity(active).insert((
                    RigidBody::Dynamic,
                    bird_groups(),
                    Velocity::linear(impulse),
                ));
                round.record_launch(tick.0, config.launch_cooldown_ticks);
                scheduler.cancel_poll();
                scheduler.schedule_after(
                    tick.0,
                    config.poll_interval_ticks,
                    ScheduledAction::PollRound,
                );
                info!(
                    "Launched {} bird ({}/{}) with impulse {:.0?}",
                    bird.kind().name(),
                    round.birds_used(),
                    round.roster().len(),
                    impulse
                );
            }
            LauncherInput::ActivateAbility => {
                if !round.ability_ready(tick.0) {
                    continue;
                }
                if let Some(bird) = round.active_bird() {
                    abilities.write(AbilityRequested {
                        bird,
                        source: AbilitySource::Player,
                    });
                }
            }
        }
    }
}

/// Evaluate due polls.
///
/// A bird that was removed (detonated, culled) leaves its turn open until
/// every destructible has slowed below `settle_speed`, so blast debris can
/// still finish targets off.  The turn timeout bounds the wait.
pub fn round_poll_system(
    mut polls: MessageReader<RoundPollDue>,
    tick: Res<SimTick>,
    config: Res<GameConfig>,
    mut round: ResMut<Round>,
    mut scheduler: ResMut<TickScheduler>,
    mut q_birds: Query<(&mut Bird, &mut Transform)>,
    q_debris: Query<&Velocity, With<Destructible>>,
    mut completed: MessageWriter<LevelCompleted>,
    mut game_over: MessageWriter<GameOver>,
) {
    if polls.read().count() == 0 {
        return;
    }

    let debris_at_rest = q_debris
        .iter()
        .all(|velocity| velocity.linvel.length() < config.settle_speed);
    let bird_done = match round.active_bird() {
        Some(active) => match q_birds.get(active) {
            Ok((bird, _)) => {
                bird.is_settled(config.settle_ticks) || (bird.is_destroyed() && debris_at_rest)
            }
            Err(_) => debris_at_rest,
        },
        None => true,
    };
    let turn_finished = bird_done || round.turn_timed_out(tick.0, config.turn_timeout_ticks);

    match round.decide(turn_finished) {
        PollDecision::Continue => {
            scheduler.schedule_after(
                tick.0,
                config.poll_interval_ticks,
                ScheduledAction::PollRound,
            );
        }
        PollDecision::LevelComplete => {
            let outcome = round.complete(config.unused_bird_bonus);
            scheduler.clear();
            info!(
                "Level {} complete: score {} ({} bonus), {} stars",
                round.level_index(),
                outcome.score,
                outcome.bonus,
                outcome.stars
            );
            completed.write(LevelCompleted {
                level: round.level_index(),
                score: outcome.score,
                stars: outcome.stars,
                bonus: outcome.bonus,
            });
        }
        PollDecision::GameOver => {
            let stars = round.fail();
            scheduler.clear();
            info!("Game over on level {}: score {}", round.level_index(), round.score());
            game_over.write(GameOver {
                level: round.level_index(),
                score: round.score(),
                stars,
            });
        }
        PollDecision::Advance => {
            if let Some(next) = round.advance() {
                let resting = round.launcher().resting_point();
                if let Ok((mut bird, mut transform)) = q_birds.get_mut(next) {
                    bird.make_ready();
                    transform.translation.x = resting.x;
                    transform.translation.y = resting.y;
                }
                let waiting: Vec<Entity> = round.queue().collect();
                for (i, entity) in waiting.into_iter().enumerate() {
                    if let Ok((bird, mut transform)) = q_birds.get_mut(entity) {
                        let slot = queue_slot(round.launcher(), &config, i, bird.kind());
                        transform.translation.x = slot.x;
                        transform.translation.y = slot.y;
                    }
                }
                debug!("Next bird {:?} is up; {} waiting", next, round.queue().count());
            }
            scheduler.schedule_after(
                tick.0,
                config.poll_interval_ticks,
                ScheduledAction::PollRound,
            );
        }
    }
}
