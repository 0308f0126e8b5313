//! Slingshot drag-and-release controller and the cosmetic trajectory preview.
//!
//! The launcher works entirely in world space; input translation (screen →
//! world) happens outside the core.  All distances are measured from the
//! **resting point** (the anchor sagged down by `launcher_sag`), not from the
//! raw anchor, so a bird pulled straight down by `max_stretch` is exactly at
//! the limit.
//!
//! ## Clamp
//!
//! A requested drag point further than `max_stretch` from rest is scaled back
//! onto the circle along the same direction.  Scaling rather than rejecting
//! keeps the drag point gliding along the boundary when the pointer leaves it.
//!
//! ## Preview
//!
//! [`TrajectoryPreview`] is an independent forward-Euler integration with
//! constant gravity.  It never consults the physics world and is allowed to
//! disagree with the real flight (contacts, damping, substeps).

use crate::bird::{Bird, BirdPhase};
use crate::config::GameConfig;
use crate::round::Round;
use bevy::prelude::*;

/// Drag state of the slingshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    anchor: Vec2,
    resting: Vec2,
    drag: Vec2,
    dragging: bool,
    max_stretch: f32,
    force_multiplier: f32,
}

impl Launcher {
    pub fn new(anchor: Vec2, sag: f32, max_stretch: f32, force_multiplier: f32) -> Self {
        let resting = anchor - Vec2::new(0.0, sag);
        Self {
            anchor,
            resting,
            drag: resting,
            dragging: false,
            max_stretch,
            force_multiplier,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.launcher_anchor(),
            config.launcher_sag,
            config.max_stretch,
            config.force_multiplier,
        )
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn resting_point(&self) -> Vec2 {
        self.resting
    }

    pub fn drag_point(&self) -> Vec2 {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn max_stretch(&self) -> f32 {
        self.max_stretch
    }

    pub fn force_multiplier(&self) -> f32 {
        self.force_multiplier
    }

    /// Project `point` into the stretch disc around the resting point.
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        let offset = point - self.resting;
        let len = offset.length();
        if len <= self.max_stretch || len == 0.0 {
            point
        } else {
            self.resting + offset * (self.max_stretch / len)
        }
    }

    /// Begin a drag session at `point` (clamped like any other drag update).
    pub fn start_drag(&mut self, point: Vec2) {
        self.dragging = true;
        self.drag = self.clamp(point);
    }

    /// Move the drag point.  Returns `true` when the stored point changed.
    /// Ignored while not dragging.
    pub fn update_drag(&mut self, point: Vec2) -> bool {
        if !self.dragging {
            return false;
        }
        let clamped = self.clamp(point);
        if clamped == self.drag {
            return false;
        }
        self.drag = clamped;
        true
    }

    /// Impulse the current drag would produce: opposite the stretch vector.
    pub fn pending_impulse(&self) -> Vec2 {
        (self.resting - self.drag) * self.force_multiplier
    }

    /// End the drag and return the launch impulse.  `None` when no drag is in
    /// progress.  The drag point snaps back to rest either way.
    pub fn release(&mut self) -> Option<Vec2> {
        if !self.dragging {
            return None;
        }
        let impulse = self.pending_impulse();
        self.dragging = false;
        self.drag = self.resting;
        Some(impulse)
    }

    /// Abort a drag without launching (round reset, terminal state).
    pub fn cancel(&mut self) {
        self.dragging = false;
        self.drag = self.resting;
    }

    /// Predicted flight path for the current drag, at most `points` long.
    pub fn trajectory_preview(&self, points: usize, params: PreviewParams) -> TrajectoryPreview {
        TrajectoryPreview {
            position: self.drag,
            velocity: self.pending_impulse(),
            params,
            arc: 0.0,
            remaining: points,
        }
    }
}

/// Integration settings for [`TrajectoryPreview`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewParams {
    /// Downward acceleration (positive number).
    pub gravity: f32,
    pub step: f32,
    /// Velocity retained per step; 1.0 disables decay.
    pub decay: f32,
    pub max_arc: f32,
    /// The preview stops before crossing below this y.
    pub ground_y: f32,
}

impl PreviewParams {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            gravity: config.gravity,
            step: config.trajectory_step,
            decay: config.trajectory_decay,
            max_arc: config.trajectory_max_arc,
            ground_y: 0.0,
        }
    }
}

/// Lazy sequence of predicted points.  Clone it to replay from the start.
#[derive(Debug, Clone)]
pub struct TrajectoryPreview {
    position: Vec2,
    velocity: Vec2,
    params: PreviewParams,
    arc: f32,
    remaining: usize,
}

impl Iterator for TrajectoryPreview {
    type Item = Vec2;

    fn next(&mut self) -> Option<Vec2> {
        if self.remaining == 0 {
            return None;
        }
        let p = self.params;
        self.velocity.y -= p.gravity * p.step;
        self.velocity *= p.decay;
        let next = self.position + self.velocity * p.step;

        let segment = next.distance(self.position);
        if next.y < p.ground_y || self.arc + segment > p.max_arc {
            self.remaining = 0;
            return None;
        }

        self.arc += segment;
        self.position = next;
        self.remaining -= 1;
        Some(next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Keep the unlaunched bird sitting in the pouch: at the drag point while
/// aiming, at the resting point otherwise.
pub fn launcher_visual_system(round: Res<Round>, mut q_birds: Query<(&Bird, &mut Transform)>) {
    let Some(active) = round.active_bird() else {
        return;
    };
    let Ok((bird, mut transform)) = q_birds.get_mut(active) else {
        return;
    };
    if bird.phase() != BirdPhase::Ready {
        return;
    }
    let target = round.launcher().drag_point();
    if transform.translation.truncate() != target {
        transform.translation.x = target.x;
        transform.translation.y = target.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> Launcher {
        Launcher::new(Vec2::new(200.0, 180.0), 10.0, 100.0, 10.0)
    }

    fn params() -> PreviewParams {
        PreviewParams {
            gravity: 980.0,
            step: 1.0 / 20.0,
            decay: 1.0,
            max_arc: 5000.0,
            ground_y: 0.0,
        }
    }

    #[test]
    fn resting_point_sags_below_anchor() {
        let l = launcher();
        assert_eq!(l.resting_point(), Vec2::new(200.0, 170.0));
        assert_eq!(l.drag_point(), l.resting_point());
        assert!(!l.is_dragging());
    }

    #[test]
    fn drag_is_clamped_for_every_direction_and_distance() {
        let mut l = launcher();
        l.start_drag(l.resting_point());
        for step in 0..72 {
            let angle = step as f32 * std::f32::consts::TAU / 72.0;
            for distance in [0.0, 10.0, 99.9, 100.0, 100.1, 250.0, 10_000.0] {
                let requested = l.resting_point() + Vec2::from_angle(angle) * distance;
                l.update_drag(requested);
                let stretch = l.drag_point().distance(l.resting_point());
                assert!(
                    stretch <= l.max_stretch() + 1e-3,
                    "angle {angle} distance {distance} stretched to {stretch}"
                );
            }
        }
    }

    #[test]
    fn clamp_preserves_direction() {
        let l = launcher();
        let requested = l.resting_point() + Vec2::new(-300.0, -400.0);
        let clamped = l.clamp(requested);
        let dir = (clamped - l.resting_point()).normalize();
        assert!((dir - Vec2::new(-0.6, -0.8)).length() < 1e-5);
        assert!((clamped.distance(l.resting_point()) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn release_impulse_is_bounded_and_opposes_stretch() {
        let mut l = launcher();
        l.start_drag(l.resting_point());
        l.update_drag(l.resting_point() + Vec2::new(-500.0, -500.0));
        let stretch = l.drag_point() - l.resting_point();

        let impulse = l.release().expect("dragging, so release yields an impulse");

        assert!(impulse.length() <= l.max_stretch() * l.force_multiplier() + 1e-2);
        let along = impulse.normalize().dot(stretch.normalize());
        assert!((along + 1.0).abs() < 1e-5, "impulse must point opposite the stretch");
        assert!(!l.is_dragging());
        assert_eq!(l.drag_point(), l.resting_point());
    }

    #[test]
    fn input_out_of_order_is_ignored() {
        let mut l = launcher();
        assert!(!l.update_drag(Vec2::new(0.0, 0.0)));
        assert_eq!(l.drag_point(), l.resting_point());
        assert_eq!(l.release(), None);
    }

    #[test]
    fn repeated_update_with_same_point_is_idempotent() {
        let mut l = launcher();
        l.start_drag(l.resting_point());
        let p = l.resting_point() + Vec2::new(-40.0, -20.0);
        assert!(l.update_drag(p));
        let snapshot = l.clone();
        assert!(!l.update_drag(p));
        assert!(!l.update_drag(p));
        assert_eq!(l, snapshot);
    }

    #[test]
    fn preview_is_bounded_and_restartable() {
        let mut l = launcher();
        l.start_drag(l.resting_point() + Vec2::new(-70.0, -70.0));
        let preview = l.trajectory_preview(12, params());

        let first: Vec<Vec2> = preview.clone().collect();
        let second: Vec<Vec2> = preview.collect();
        assert!(first.len() <= 12);
        assert!(!first.is_empty());
        assert_eq!(first, second);
        // Shot goes up and to the right.
        assert!(first[0].x > l.drag_point().x);
        assert!(first[0].y > l.drag_point().y);
    }

    #[test]
    fn preview_stops_at_ground_line() {
        let mut l = launcher();
        l.start_drag(l.resting_point() + Vec2::new(-100.0, 0.0));
        let points: Vec<Vec2> = l.trajectory_preview(10_000, params()).collect();
        assert!(points.len() < 10_000, "a ballistic arc must reach the ground");
        assert!(points.iter().all(|p| p.y >= 0.0));
    }

    #[test]
    fn preview_respects_arc_budget() {
        let mut l = launcher();
        l.start_drag(l.resting_point() + Vec2::new(-100.0, -100.0));
        let mut p = params();
        p.max_arc = 150.0;
        let points: Vec<Vec2> = l.trajectory_preview(500, p).collect();
        let mut arc = 0.0;
        let mut prev = l.drag_point();
        for point in &points {
            arc += point.distance(prev);
            prev = *point;
        }
        assert!(arc <= 150.0 + 1e-3);
        assert!(points.len() < 500);
    }
}
