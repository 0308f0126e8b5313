//! Single consumer of Rapier's collision batch.
//!
//! Every `CollisionEvent::Started` is routed to both participants by entity
//! lookup: destructibles take damage, birds record their first contact (and
//! the detonating kind schedules its ability), eggs arm themselves.  Nothing
//! is despawned here; the owning modules act on the recorded state later in
//! the same tick.
//!
//! Impact speed is read from [`PreStepVelocity`], the motion the pair had
//! before Rapier resolved the contact.

use crate::ability::Egg;
use crate::bird::{Bird, CollisionReaction};
use crate::config::GameConfig;
use crate::destructible::{Destructible, Impact, ImpactOutcome};
use crate::physics::{BodyMass, PreStepVelocity};
use crate::schedule::{ScheduledAction, SimTick, TickScheduler};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

type MotionQuery<'w, 's> = Query<
    'w,
    's,
    (
        Option<&'static PreStepVelocity>,
        Option<&'static BodyMass>,
        Option<&'static RigidBody>,
    ),
>;

pub fn collision_dispatch_system(
    mut collision_events: MessageReader<CollisionEvent>,
    tick: Res<SimTick>,
    config: Res<GameConfig>,
    mut scheduler: ResMut<TickScheduler>,
    q_motion: MotionQuery,
    mut q_destructibles: Query<&mut Destructible>,
    mut q_birds: Query<&mut Bird>,
    mut q_eggs: Query<&mut Egg>,
) {
    let damage = config.damage();

    for event in collision_events.read() {
        let (e1, e2) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2),
            CollisionEvent::Stopped(..) => continue,
        };

        for (me, other) in [(e1, e2), (e2, e1)] {
            if let Ok(mut destructible) = q_destructibles.get_mut(me) {
                let impact = Impact {
                    other,
                    relative_speed: relative_speed(&q_motion, me, other),
                    other_mass: partner_mass(&q_motion, me, other),
                    other_is_bird: q_birds.contains(other),
                };
                match destructible.register_impact(impact, tick.0, &damage) {
                    ImpactOutcome::Destroyed { damage } => {
                        debug!("{:?} destroyed by {:?} ({damage:.1} damage)", me, other);
                    }
                    ImpactOutcome::Damaged { damage } => {
                        trace!(
                            "{:?} took {damage:.1} from {:?}, {:.1} left",
                            me,
                            other,
                            destructible.health()
                        );
                    }
                    _ => {}
                }
            }

            if let Ok(mut bird) = q_birds.get_mut(me) {
                if bird.observe_collision() == CollisionReaction::ScheduleDetonation {
                    let due = scheduler.schedule_after(
                        tick.0,
                        config.auto_detonate_delay_ticks,
                        ScheduledAction::TriggerAbility(me),
                    );
                    debug!("Bird {:?} detonates at tick {due}", me);
                }
            }

            if let Ok(mut egg) = q_eggs.get_mut(me) {
                egg.armed = true;
            }
        }
    }
}

/// Closing speed of the pair before the step.  Bodies without a snapshot
/// (the fixed ground) count as still.
fn relative_speed(q_motion: &MotionQuery, a: Entity, b: Entity) -> f32 {
    let velocity = |e: Entity| {
        q_motion
            .get(e)
            .ok()
            .and_then(|(v, ..)| v.map(|v| v.0))
            .unwrap_or(Vec2::ZERO)
    };
    (velocity(a) - velocity(b)).length()
}

/// Mass of `other` if it is a dynamic body, else the mass of `me`.
fn partner_mass(q_motion: &MotionQuery, me: Entity, other: Entity) -> f32 {
    let dynamic_mass = |e: Entity| match q_motion.get(e) {
        Ok((_, Some(mass), Some(RigidBody::Dynamic))) => Some(mass.0),
        _ => None,
    };
    dynamic_mass(other)
        .or_else(|| q_motion.get(me).ok().and_then(|(_, m, _)| m.map(|m| m.0)))
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bird::BirdKind;
    use crate::destructible::{DestructibleClass, Material, TargetSize};
    use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<Messages<CollisionEvent>>();
        world.insert_resource(SimTick(100));
        world.insert_resource(GameConfig::default());
        world.init_resource::<TickScheduler>();
        world
    }

    fn destructible(class: DestructibleClass) -> Destructible {
        Destructible::from_config(class, &GameConfig::default())
    }

    fn launched(kind: BirdKind) -> Bird {
        let mut bird = Bird::ready(kind);
        bird.launch();
        bird
    }

    /// A dynamic body that entered the step at `before` and left it at `after`.
    fn moving(mass: f32, before: Vec2, after: Vec2) -> impl Bundle {
        (
            RigidBody::Dynamic,
            BodyMass(mass),
            PreStepVelocity(before),
            Velocity::linear(after),
        )
    }

    fn started(world: &mut World, a: Entity, b: Entity) {
        world.write_message(CollisionEvent::Started(a, b, CollisionEventFlags::empty()));
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(collision_dispatch_system);
        schedule.run(world);
    }

    #[test]
    fn bird_hit_damages_target_with_bonus() {
        let mut world = world();
        let target = world
            .spawn((
                destructible(DestructibleClass::Target(TargetSize::Large)),
                moving(2.5, Vec2::ZERO, Vec2::ZERO),
            ))
            .id();
        let bird = world
            .spawn((
                launched(BirdKind::Red),
                moving(1.0, Vec2::new(200.0, 0.0), Vec2::new(200.0, 0.0)),
            ))
            .id();

        started(&mut world, bird, target);
        run(&mut world);

        // 200 * 1.0 * 0.1 * 2.0 = 40
        let health = world.get::<Destructible>(target).unwrap().health();
        assert!((health - 40.0).abs() < 1e-3, "health {health}");
        assert!(world.get::<Bird>(bird).unwrap().collided());
    }

    #[test]
    fn impact_speed_is_taken_before_the_bounce() {
        let mut world = world();
        let block = world
            .spawn((
                destructible(DestructibleClass::Block(Material::Stone)),
                moving(7.2, Vec2::ZERO, Vec2::new(120.0, 0.0)),
            ))
            .id();
        // Rapier already bounced the bird back at a fraction of its speed.
        let bird = world
            .spawn((
                launched(BirdKind::Red),
                moving(1.0, Vec2::new(1000.0, 0.0), Vec2::new(-200.0, 0.0)),
            ))
            .id();

        started(&mut world, bird, block);
        run(&mut world);

        // 1000 * 1.0 * 0.03 * 2.0 = 60
        let health = world.get::<Destructible>(block).unwrap().health();
        assert!((health - 90.0).abs() < 1e-3, "health {health}");
    }

    #[test]
    fn ground_contact_uses_own_mass() {
        let mut world = world();
        let ground = world.spawn(RigidBody::Fixed).id();
        let block = world
            .spawn((
                destructible(DestructibleClass::Block(Material::Wood)),
                moving(4.0, Vec2::new(0.0, -100.0), Vec2::ZERO),
            ))
            .id();

        started(&mut world, ground, block);
        run(&mut world);

        // 100 * 4.0 * 0.08 = 32
        let health = world.get::<Destructible>(block).unwrap().health();
        assert!((health - 28.0).abs() < 1e-3, "health {health}");
    }

    #[test]
    fn black_bird_impact_schedules_one_detonation() {
        let mut world = world();
        let wall = world.spawn(RigidBody::Fixed).id();
        let bird = world
            .spawn((
                launched(BirdKind::Black),
                moving(1.6, Vec2::X * 300.0, Vec2::ZERO),
            ))
            .id();

        started(&mut world, bird, wall);
        started(&mut world, wall, bird);
        run(&mut world);

        let scheduler = world.resource::<TickScheduler>();
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.is_scheduled(ScheduledAction::TriggerAbility(bird)));
    }

    #[test]
    fn stopped_events_are_ignored_and_eggs_arm_on_contact() {
        let mut world = world();
        let wall = world.spawn(RigidBody::Fixed).id();
        let egg = world.spawn(Egg::default()).id();

        world.write_message(CollisionEvent::Stopped(egg, wall, CollisionEventFlags::empty()));
        run(&mut world);
        assert!(!world.get::<Egg>(egg).unwrap().armed);

        started(&mut world, wall, egg);
        run(&mut world);
        assert!(world.get::<Egg>(egg).unwrap().armed);
    }
}
