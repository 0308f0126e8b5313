//! Bird abilities: a pure planner plus the system that applies its output.
//!
//! [`plan_ability`] looks at a snapshot of the caster and of every dynamic
//! body nearby and returns a list of [`AbilityCommand`]s.  It never touches
//! the ECS, so each effect can be unit-tested with plain vectors.
//! [`ability_activation_system`] gates the request on the bird's state
//! machine, builds the snapshot, plans, and applies the commands through
//! `Commands` / component writes.
//!
//! Eggs dropped by the White bird are their own entity with an [`Egg`]
//! marker.  The collision dispatcher arms them on first contact and
//! [`egg_detonation_system`] blows them up on the next pass.

use crate::bird::{spawn_flying_bird, Ability, Bird, BirdKind, BIRD_Z};
use crate::config::{AbilityTuning, GameConfig};
use crate::physics::{
    dynamic_body, egg_groups, outside_world, split_family_groups, BodyMass, SplitFamilies,
};
use crate::round::RoundEntity;
use crate::schedule::TickScheduler;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Who asked for the ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilitySource {
    /// Player input, already past the round's launch cooldown.
    Player,
    /// Deferred impact reaction from the tick scheduler.
    Impact,
}

/// Request to run a bird's ability this tick.
#[derive(Message, Debug, Clone, Copy)]
pub struct AbilityRequested {
    pub bird: Entity,
    pub source: AbilitySource,
}

/// The caster as seen by the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityContext {
    pub entity: Entity,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

/// A dynamic body that area effects may push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub entity: Entity,
    pub position: Vec2,
    pub mass: f32,
}

/// One mutation produced by an ability.
#[derive(Debug, Clone, PartialEq)]
pub enum AbilityCommand {
    Impulse { target: Entity, impulse: Vec2 },
    SetVelocity { target: Entity, linvel: Vec2 },
    /// Give the parent and two new children a shared family group.
    Split {
        parent: Entity,
        position: Vec2,
        velocities: [Vec2; 2],
    },
    SpawnEgg { position: Vec2, linvel: Vec2 },
    Remove { target: Entity },
}

/// Egg body dropped by the White bird.
#[derive(Component, Debug, Default)]
pub struct Egg {
    /// Set by the collision dispatcher on first contact.
    pub armed: bool,
}

/// Push every body within `radius` of `center` away from it.
///
/// Impulse magnitude decays linearly from `force` at the center to zero at
/// the rim and is scaled by the pushed body's mass, so light and heavy bodies
/// gain the same speed at equal distance.  A body exactly at the center is
/// pushed straight up.
pub fn area_impulse(
    center: Vec2,
    radius: f32,
    force: f32,
    bodies: &[BodySnapshot],
    exclude: Option<Entity>,
) -> Vec<AbilityCommand> {
    bodies
        .iter()
        .filter(|b| Some(b.entity) != exclude)
        .filter_map(|b| {
            let offset = b.position - center;
            let distance = offset.length();
            if distance >= radius {
                return None;
            }
            let dir = offset.try_normalize().unwrap_or(Vec2::Y);
            let falloff = 1.0 - distance / radius;
            Some(AbilityCommand::Impulse {
                target: b.entity,
                impulse: dir * force * falloff * b.mass,
            })
        })
        .collect()
}

/// Plan the effect of `ability` cast by `ctx`.
pub fn plan_ability(
    ability: Ability,
    ctx: &AbilityContext,
    bodies: &[BodySnapshot],
    tuning: &AbilityTuning,
) -> Vec<AbilityCommand> {
    match ability {
        Ability::Shockwave => area_impulse(
            ctx.position,
            tuning.shockwave_radius,
            tuning.shockwave_force,
            bodies,
            Some(ctx.entity),
        ),
        Ability::Split => {
            let left = Vec2::from_angle(tuning.split_angle).rotate(ctx.velocity);
            let right = Vec2::from_angle(-tuning.split_angle).rotate(ctx.velocity);
            vec![AbilityCommand::Split {
                parent: ctx.entity,
                position: ctx.position,
                velocities: [left, right],
            }]
        }
        Ability::Boost => {
            let f = tuning.boost_factor;
            vec![AbilityCommand::SetVelocity {
                target: ctx.entity,
                linvel: Vec2::new(
                    ctx.velocity.x * f,
                    ctx.velocity.y * f * tuning.boost_vertical_bias,
                ),
            }]
        }
        Ability::EggDrop => vec![
            AbilityCommand::SpawnEgg {
                position: ctx.position - Vec2::new(0.0, ctx.radius),
                linvel: Vec2::new(ctx.velocity.x * tuning.egg_horizontal_fraction, 0.0),
            },
            AbilityCommand::SetVelocity {
                target: ctx.entity,
                linvel: Vec2::new(ctx.velocity.x, tuning.egg_parent_lift),
            },
        ],
        Ability::Detonate => {
            let mut cmds = area_impulse(
                ctx.position,
                tuning.detonation_radius,
                tuning.detonation_force,
                bodies,
                Some(ctx.entity),
            );
            cmds.push(AbilityCommand::Remove { target: ctx.entity });
            cmds
        }
    }
}

type AbilityBodies<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static RigidBody,
        &'static Transform,
        &'static mut Velocity,
        &'static BodyMass,
        Option<&'static mut Bird>,
        Option<&'static mut ExternalImpulse>,
    ),
>;

/// Run every requested ability whose gate is open.
pub fn ability_activation_system(
    mut commands: Commands,
    mut requests: MessageReader<AbilityRequested>,
    config: Res<GameConfig>,
    mut families: ResMut<SplitFamilies>,
    mut scheduler: ResMut<TickScheduler>,
    mut q_bodies: AbilityBodies,
) {
    let tuning = config.abilities();

    for request in requests.read() {
        let Ok((entity, _, transform, velocity, _, Some(mut bird), _)) =
            q_bodies.get_mut(request.bird)
        else {
            debug!("Ability request for missing bird {:?}", request.bird);
            continue;
        };
        let Some(ability) = bird.activate_ability() else {
            continue;
        };
        let ctx = AbilityContext {
            entity,
            position: transform.translation.truncate(),
            velocity: velocity.linvel,
            radius: config.bird(bird.kind()).radius,
        };
        info!(
            "{} bird {:?} fires {:?} ({:?})",
            bird.kind().name(),
            entity,
            ability,
            request.source
        );

        let snapshot: Vec<BodySnapshot> = q_bodies
            .iter()
            .filter(|(_, body, ..)| **body == RigidBody::Dynamic)
            .map(|(e, _, t, _, mass, ..)| BodySnapshot {
                entity: e,
                position: t.translation.truncate(),
                mass: mass.0,
            })
            .collect();

        for command in plan_ability(ability, &ctx, &snapshot, &tuning) {
            apply_command(
                command,
                &mut commands,
                &config,
                &mut families,
                &mut scheduler,
                &mut q_bodies,
            );
        }
    }
}

fn apply_command(
    command: AbilityCommand,
    commands: &mut Commands,
    config: &GameConfig,
    families: &mut SplitFamilies,
    scheduler: &mut TickScheduler,
    q_bodies: &mut AbilityBodies,
) {
    match command {
        AbilityCommand::Impulse { target, impulse } => {
            if let Ok((.., Some(mut ext))) = q_bodies.get_mut(target) {
                ext.impulse += impulse;
            }
        }
        AbilityCommand::SetVelocity { target, linvel } => {
            if let Ok((_, _, _, mut velocity, ..)) = q_bodies.get_mut(target) {
                velocity.linvel = linvel;
            }
        }
        AbilityCommand::Split {
            parent,
            position,
            velocities,
        } => {
            let groups = split_family_groups(families.allocate());
            commands.entity(parent).try_insert(groups);
            for linvel in velocities {
                spawn_flying_bird(
                    commands,
                    Bird::split_child(BirdKind::Blue),
                    position,
                    linvel,
                    groups,
                    config,
                );
            }
        }
        AbilityCommand::SpawnEgg { position, linvel } => {
            commands
                .spawn((
                    Egg::default(),
                    RoundEntity,
                    Transform::from_translation(position.extend(BIRD_Z)),
                    dynamic_body(
                        Collider::ball(config.egg_radius),
                        config.egg_mass,
                        config.egg_restitution,
                        config.egg_friction,
                        egg_groups(),
                    ),
                ))
                .insert(Velocity::linear(linvel));
        }
        AbilityCommand::Remove { target } => {
            if let Ok((.., Some(mut bird), _)) = q_bodies.get_mut(target) {
                bird.mark_destroyed();
            }
            scheduler.cancel_for(target);
            commands.entity(target).try_despawn();
        }
    }
}

/// Explode armed eggs and drop eggs that fell out of the world.
pub fn egg_detonation_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    q_eggs: Query<(Entity, &Egg, &Transform)>,
    mut q_bodies: Query<
        (Entity, &RigidBody, &Transform, &BodyMass, &mut ExternalImpulse),
        Without<Egg>,
    >,
) {
    for (egg, state, transform) in q_eggs.iter() {
        let center = transform.translation.truncate();
        if outside_world(center, &config) {
            commands.entity(egg).despawn();
            continue;
        }
        if !state.armed {
            continue;
        }

        let snapshot: Vec<BodySnapshot> = q_bodies
            .iter()
            .filter(|(_, body, ..)| **body == RigidBody::Dynamic)
            .map(|(e, _, t, mass, _)| BodySnapshot {
                entity: e,
                position: t.translation.truncate(),
                mass: mass.0,
            })
            .collect();

        let blast = area_impulse(
            center,
            config.egg_blast_radius,
            config.egg_blast_force,
            &snapshot,
            None,
        );
        debug!("Egg {:?} exploded, pushing {} bodies", egg, blast.len());
        for command in blast {
            if let AbilityCommand::Impulse { target, impulse } = command {
                if let Ok((.., mut ext)) = q_bodies.get_mut(target) {
                    ext.impulse += impulse;
                }
            }
        }
        commands.entity(egg).despawn();
    }
}
