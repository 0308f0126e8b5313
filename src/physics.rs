//! Glue between the game entities and the Rapier world.
//!
//! The core never steps physics itself.  It only builds rigid-body bundles,
//! flips body types, writes `ExternalImpulse` / `Velocity`, and reads the
//! collision batch Rapier emits after each step.
//!
//! By the time that batch is read, Rapier has already resolved the contacts
//! and written post-bounce velocities back.  [`PreStepVelocity`] keeps the
//! velocity each body entered the step with; impact strength is measured
//! from it.
//!
//! ## Collision groups
//!
//! | Layer        | Group         | Collides with                          |
//! |--------------|---------------|----------------------------------------|
//! | Ground       | GROUP_1       | everything                             |
//! | Blocks       | GROUP_2       | everything                             |
//! | Targets      | GROUP_3       | everything                             |
//! | Birds        | GROUP_4       | everything except eggs                 |
//! | Eggs         | GROUP_5       | everything except birds                |
//! | Split family | GROUP_6..=13  | everything except its own family group |
//! | Queued/aim   | none          | nothing                                |
//!
//! A split family (parent + two children) swaps its bird membership for a
//! single family bit and filters that bit out, so siblings pass through each
//! other while still hitting ground, blocks, targets and other birds.  Family
//! bits are handed out round-robin by [`SplitFamilies`].

use crate::config::GameConfig;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub const GROUND: Group = Group::GROUP_1;
pub const BLOCKS: Group = Group::GROUP_2;
pub const TARGETS: Group = Group::GROUP_3;
pub const BIRDS: Group = Group::GROUP_4;
pub const EGGS: Group = Group::GROUP_5;

/// Number of distinct split-family bits (GROUP_6 ..= GROUP_13).
pub const SPLIT_FAMILY_SLOTS: u32 = 8;
const SPLIT_FAMILY_FIRST_BIT: u32 = 5;

/// Mass as configured at spawn time.  Mirrors `ColliderMassProperties::Mass`
/// so gameplay code can read it without waiting for Rapier's readback.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BodyMass(pub f32);

/// Linear velocity a body had when the last physics step started.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct PreStepVelocity(pub Vec2);

/// Marker for the static ground slab.
#[derive(Component, Debug)]
pub struct Ground;

/// Round-robin allocator for split-family collision bits.
#[derive(Resource, Debug, Default)]
pub struct SplitFamilies {
    next: u32,
}

impl SplitFamilies {
    pub fn allocate(&mut self) -> Group {
        let group = split_family_group(self.next);
        self.next = (self.next + 1) % SPLIT_FAMILY_SLOTS;
        group
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

pub fn split_family_group(slot: u32) -> Group {
    Group::from_bits_truncate(1 << (SPLIT_FAMILY_FIRST_BIT + slot % SPLIT_FAMILY_SLOTS))
}

/// Ground, blocks and targets: a membership bit, colliding with everything.
pub fn solid_groups(membership: Group) -> CollisionGroups {
    CollisionGroups::new(membership, Group::ALL)
}

/// Birds waiting in line or sitting in the pouch.
pub fn inert_groups() -> CollisionGroups {
    CollisionGroups::new(Group::NONE, Group::NONE)
}

pub fn bird_groups() -> CollisionGroups {
    CollisionGroups::new(BIRDS, Group::ALL.difference(EGGS))
}

pub fn split_family_groups(family: Group) -> CollisionGroups {
    CollisionGroups::new(family, Group::ALL.difference(family))
}

pub fn egg_groups() -> CollisionGroups {
    CollisionGroups::new(EGGS, Group::ALL.difference(BIRDS))
}

/// Mirror of Rapier's pair test: both memberships must pass the other's filter.
pub fn groups_interact(a: CollisionGroups, b: CollisionGroups) -> bool {
    a.memberships.intersects(b.filters) && b.memberships.intersects(a.filters)
}

/// Common dynamic-body components shared by every movable entity.
pub fn dynamic_body(
    collider: Collider,
    mass: f32,
    restitution: f32,
    friction: f32,
    groups: CollisionGroups,
) -> impl Bundle {
    (
        RigidBody::Dynamic,
        collider,
        ColliderMassProperties::Mass(mass),
        BodyMass(mass),
        Restitution::coefficient(restitution),
        Friction::coefficient(friction),
        Velocity::zero(),
        PreStepVelocity::default(),
        ExternalImpulse::default(),
        groups,
        ActiveEvents::COLLISION_EVENTS,
        Sleeping::disabled(),
    )
}

/// Static ground slab whose top face is the line y = 0.  Extends one world
/// width past either side so overshooting birds still land on something.
pub fn ground_bundle(config: &GameConfig) -> impl Bundle {
    let half_thickness = crate::constants::GROUND_HALF_THICKNESS;
    (
        Ground,
        Transform::from_xyz(config.world_width / 2.0, -half_thickness, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(config.world_width * 1.5, half_thickness),
        Friction::coefficient(0.9),
        solid_groups(GROUND),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// True when `position` has left the playable volume.
pub fn outside_world(position: Vec2, config: &GameConfig) -> bool {
    position.y < -config.kill_margin
        || position.x < -config.kill_margin
        || position.x > config.world_width + config.kill_margin
}

/// Apply the configured gravity to every Rapier context.  Run it whenever
/// [`GameConfig`] changes; contexts are created by the Rapier plugin.
pub fn apply_gravity_system(
    config: Res<GameConfig>,
    mut contexts: Query<&mut RapierConfiguration>,
) {
    for mut rapier in contexts.iter_mut() {
        rapier.gravity = Vec2::new(0.0, -config.gravity);
    }
}

/// Record every body's velocity just before Rapier steps.  Scheduled ahead
/// of [`PhysicsSet::StepSimulation`].
pub fn snapshot_pre_step_velocity_system(mut q_bodies: Query<(&Velocity, &mut PreStepVelocity)>) {
    for (velocity, mut snapshot) in q_bodies.iter_mut() {
        snapshot.0 = velocity.linvel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_siblings_never_interact_but_hit_the_level() {
        let mut families = SplitFamilies::default();
        let family = split_family_groups(families.allocate());

        assert!(!groups_interact(family, family));
        assert!(groups_interact(family, solid_groups(GROUND)));
        assert!(groups_interact(family, solid_groups(BLOCKS)));
        assert!(groups_interact(family, solid_groups(TARGETS)));
        assert!(groups_interact(family, bird_groups()));
    }

    #[test]
    fn different_families_still_collide() {
        let mut families = SplitFamilies::default();
        let a = split_family_groups(families.allocate());
        let b = split_family_groups(families.allocate());
        assert!(groups_interact(a, b));
    }

    #[test]
    fn family_bits_wrap_around() {
        let mut families = SplitFamilies::default();
        let first = families.allocate();
        for _ in 1..SPLIT_FAMILY_SLOTS {
            let g = families.allocate();
            assert_ne!(g, first);
            assert!(!g.intersects(GROUND | BLOCKS | TARGETS | BIRDS | EGGS));
        }
        assert_eq!(families.allocate(), first);
    }

    #[test]
    fn inert_birds_touch_nothing_and_eggs_skip_birds() {
        for other in [solid_groups(GROUND), solid_groups(BLOCKS), bird_groups()] {
            assert!(!groups_interact(inert_groups(), other));
        }
        assert!(!groups_interact(egg_groups(), bird_groups()));
        assert!(groups_interact(egg_groups(), solid_groups(BLOCKS)));
    }

    #[test]
    fn snapshot_copies_current_velocity() {
        let mut world = World::new();
        let body = world
            .spawn((Velocity::linear(Vec2::new(3.0, -4.0)), PreStepVelocity::default()))
            .id();
        let mut schedule = Schedule::default();
        schedule.add_systems(snapshot_pre_step_velocity_system);
        schedule.run(&mut world);
        assert_eq!(world.get::<PreStepVelocity>(body).unwrap().0, Vec2::new(3.0, -4.0));
    }

    #[test]
    fn kill_plane() {
        let config = GameConfig::default();
        assert!(!outside_world(Vec2::new(100.0, 10.0), &config));
        assert!(outside_world(Vec2::new(100.0, -config.kill_margin - 1.0), &config));
        assert!(outside_world(
            Vec2::new(config.world_width + config.kill_margin + 1.0, 50.0),
            &config
        ));
    }
}
