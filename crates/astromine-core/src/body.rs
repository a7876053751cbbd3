//! Point-mass kinematics with semi-implicit Euler integration.

use glam::Vec2;

use crate::config::MotionParams;

/// Kinematic state owned by exactly one agent.
///
/// Forces accumulate into the acceleration between integrations, and
/// [`KinematicBody::integrate`] zeroes the accumulator afterwards, so an agent
/// that receives no forces during a tick coasts at constant velocity.
#[derive(Debug, Clone)]
pub struct KinematicBody {
    velocity: Vec2,
    acceleration: Vec2,
    heading: Vec2,
    mass: f32,
    use_friction: bool,
    friction_coefficient: f32,
    use_gravity: bool,
    gravity: Vec2,
}

impl KinematicBody {
    /// Builds a body at rest with the given motion limits.
    #[must_use]
    pub fn new(params: &MotionParams) -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            heading: Vec2::ZERO,
            mass: params.mass,
            use_friction: params.use_friction,
            friction_coefficient: params.friction_coefficient,
            use_gravity: params.use_gravity,
            gravity: Vec2::NEG_Y,
        }
    }

    /// Current velocity, world units per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Replaces the velocity outright, bypassing force accumulation.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Last non-zero travel direction as a unit vector. Zero until the body
    /// has ever moved.
    #[must_use]
    pub fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Overrides the travel direction, e.g. to face a landed ship outward.
    pub fn set_heading(&mut self, heading: Vec2) {
        self.heading = heading;
    }

    /// Acceleration accumulated since the last integration.
    #[must_use]
    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    /// Mass dividing applied forces.
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Accumulates a force, scaled into acceleration by the body's mass.
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force / self.mass;
    }

    /// Applies a friction force opposing the current velocity.
    ///
    /// The force has magnitude `coefficient` regardless of speed, and is a
    /// no-op while the body is at rest.
    pub fn apply_friction(&mut self, coefficient: f32) {
        let friction = (-self.velocity).normalize_or_zero() * coefficient;
        self.apply_force(friction);
    }

    /// Applies the configured downward gravity as a force scaled by mass.
    pub fn apply_gravity(&mut self) {
        self.apply_force(self.gravity * self.mass);
    }

    /// Applies the spawn-time impulses the body was configured with.
    pub fn apply_spawn_impulses(&mut self) {
        if self.use_friction {
            self.apply_friction(self.friction_coefficient);
        }
        if self.use_gravity {
            self.apply_gravity();
        }
    }

    /// Advances velocity then position by `dt` seconds and resets the
    /// accumulated acceleration.
    ///
    /// The heading tracks the normalized velocity but keeps its previous
    /// value while the body is exactly at rest, so a stationary agent still
    /// remembers which way it was facing.
    pub fn integrate(&mut self, position: &mut Vec2, dt: f32) {
        self.velocity += self.acceleration * dt;
        *position += self.velocity * dt;
        if self.velocity != Vec2::ZERO {
            self.heading = self.velocity.normalize_or_zero();
        }
        self.acceleration = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn body() -> KinematicBody {
        KinematicBody::new(&MotionParams::default())
    }

    #[test]
    fn coasts_at_constant_velocity_without_forces() {
        let mut body = body();
        body.set_velocity(Vec2::new(1.0, 2.0));
        let mut position = Vec2::ZERO;

        body.integrate(&mut position, 0.5);

        assert_eq!(position, Vec2::new(0.5, 1.0));
        assert_eq!(body.velocity(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn force_is_scaled_by_mass() {
        let mut body = KinematicBody::new(&MotionParams {
            mass: 2.0,
            ..MotionParams::default()
        });
        body.apply_force(Vec2::new(4.0, 0.0));
        assert_eq!(body.acceleration(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn acceleration_resets_after_integration() {
        let mut body = body();
        body.apply_force(Vec2::new(3.0, -1.0));
        let mut position = Vec2::ZERO;

        body.integrate(&mut position, 1.0);

        assert_eq!(body.acceleration(), Vec2::ZERO);
        assert_eq!(body.velocity(), Vec2::new(3.0, -1.0));
    }

    #[test]
    fn velocity_updates_before_position() {
        let mut body = body();
        body.apply_force(Vec2::new(2.0, 0.0));
        let mut position = Vec2::ZERO;

        body.integrate(&mut position, 1.0);

        // Semi-implicit Euler: the fresh velocity moves the position on the
        // same tick the force lands.
        assert_eq!(position, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn heading_persists_while_at_rest() {
        let mut body = body();
        let mut position = Vec2::ZERO;
        body.set_velocity(Vec2::new(0.0, 3.0));
        body.integrate(&mut position, 0.1);
        assert_relative_eq!(body.heading().y, 1.0);

        body.set_velocity(Vec2::ZERO);
        body.integrate(&mut position, 0.1);
        assert_relative_eq!(body.heading().y, 1.0);
    }

    #[test]
    fn friction_opposes_motion_and_idles_at_rest() {
        let mut body = body();
        body.set_velocity(Vec2::new(2.0, 0.0));
        body.apply_friction(0.5);
        assert_relative_eq!(body.acceleration().x, -0.5);

        let mut resting = KinematicBody::new(&MotionParams::default());
        resting.apply_friction(0.5);
        assert_eq!(resting.acceleration(), Vec2::ZERO);
    }

    #[test]
    fn gravity_impulse_is_mass_independent() {
        let mut heavy = KinematicBody::new(&MotionParams {
            mass: 8.0,
            use_gravity: true,
            ..MotionParams::default()
        });
        heavy.apply_spawn_impulses();
        assert_eq!(heavy.acceleration(), Vec2::NEG_Y);
    }
}
