//! Tick clock and deferred-callback queue.
//!
//! Every timed effect in the round (deferred auto-detonation, the periodic
//! round poll) is a [`ScheduledAction`] keyed by the tick it becomes due.
//! [`advance_tick_system`] runs first in every frame: it bumps [`SimTick`]
//! and turns everything due into messages for the systems that own the
//! effect.  Nothing here is wall-clock based, so tests advance the game by
//! calling `app.update()` N times.
//!
//! Cancellation is explicit: the round controller calls
//! [`TickScheduler::clear`] on every reset and [`TickScheduler::cancel_for`]
//! when a bird leaves the world, so a stale callback can never touch a newer
//! round's entities.

use crate::ability::{AbilityRequested, AbilitySource};
use crate::round::RoundPollDue;
use bevy::prelude::*;
use std::collections::BTreeMap;

/// Monotonic tick counter.  Incremented once per `Update`.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimTick(pub u64);

/// A deferred effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Fire the bird's ability as an impact reaction.
    TriggerAbility(Entity),
    /// Evaluate settle / win / loss conditions.
    PollRound,
}

impl ScheduledAction {
    fn targets(&self, entity: Entity) -> bool {
        matches!(self, ScheduledAction::TriggerAbility(e) if *e == entity)
    }
}

/// Tick-keyed queue of pending actions.  Actions sharing a due tick fire in
/// insertion order.
#[derive(Resource, Debug, Default)]
pub struct TickScheduler {
    pending: BTreeMap<u64, Vec<ScheduledAction>>,
}

impl TickScheduler {
    pub fn schedule(&mut self, due_tick: u64, action: ScheduledAction) {
        self.pending.entry(due_tick).or_default().push(action);
    }

    /// Schedule `action` `delay` ticks after `now`; returns the due tick.
    pub fn schedule_after(&mut self, now: u64, delay: u64, action: ScheduledAction) -> u64 {
        let due = now.saturating_add(delay);
        self.schedule(due, action);
        due
    }

    /// Remove every pending action matching `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&ScheduledAction) -> bool) {
        self.pending.retain(|_, actions| {
            actions.retain(|a| !predicate(a));
            !actions.is_empty()
        });
    }

    pub fn cancel_for(&mut self, entity: Entity) {
        self.cancel_where(|a| a.targets(entity));
    }

    pub fn cancel_poll(&mut self) {
        self.cancel_where(|a| *a == ScheduledAction::PollRound);
    }

    pub fn is_scheduled(&self, action: ScheduledAction) -> bool {
        self.pending.values().any(|v| v.contains(&action))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every action due at or before `now`, oldest first.
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledAction> {
        let later = self.pending.split_off(&now.saturating_add(1));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().flatten().collect()
    }
}

/// Advance the clock and dispatch every due action as a message.
pub fn advance_tick_system(
    mut tick: ResMut<SimTick>,
    mut scheduler: ResMut<TickScheduler>,
    mut ability_requests: MessageWriter<AbilityRequested>,
    mut polls: MessageWriter<RoundPollDue>,
) {
    tick.0 += 1;
    for action in scheduler.drain_due(tick.0) {
        match action {
            ScheduledAction::TriggerAbility(bird) => {
                ability_requests.write(AbilityRequested {
                    bird,
                    source: AbilitySource::Impact,
                });
            }
            ScheduledAction::PollRound => {
                polls.write(RoundPollDue { tick: tick.0 });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities<const N: usize>() -> [Entity; N] {
        let mut world = World::new();
        std::array::from_fn(|_| world.spawn_empty().id())
    }

    #[test]
    fn drain_returns_only_due_actions_in_tick_order() {
        let [a, b] = entities::<2>();
        let mut s = TickScheduler::default();
        s.schedule(5, ScheduledAction::PollRound);
        s.schedule(2, ScheduledAction::TriggerAbility(a));
        s.schedule(9, ScheduledAction::TriggerAbility(b));

        assert!(s.drain_due(1).is_empty());
        assert_eq!(
            s.drain_due(5),
            vec![
                ScheduledAction::TriggerAbility(a),
                ScheduledAction::PollRound
            ]
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s.drain_due(100), vec![ScheduledAction::TriggerAbility(b)]);
        assert!(s.is_empty());
    }

    #[test]
    fn cancel_for_only_touches_that_entity() {
        let [a, b] = entities::<2>();
        let mut s = TickScheduler::default();
        s.schedule_after(10, 3, ScheduledAction::TriggerAbility(a));
        s.schedule_after(10, 3, ScheduledAction::TriggerAbility(b));
        s.schedule_after(10, 30, ScheduledAction::PollRound);

        s.cancel_for(a);

        assert!(!s.is_scheduled(ScheduledAction::TriggerAbility(a)));
        assert!(s.is_scheduled(ScheduledAction::TriggerAbility(b)));
        assert!(s.is_scheduled(ScheduledAction::PollRound));
    }

    #[test]
    fn cancel_poll_and_clear() {
        let [a] = entities::<1>();
        let mut s = TickScheduler::default();
        s.schedule(4, ScheduledAction::PollRound);
        s.schedule(4, ScheduledAction::TriggerAbility(a));
        s.cancel_poll();
        assert_eq!(s.len(), 1);
        s.clear();
        assert!(s.is_empty());
        assert!(s.drain_due(u64::MAX).is_empty());
    }
}
