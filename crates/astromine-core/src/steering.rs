//! Steering-force toolkit shared by every agent kind.
//!
//! Forces follow the classic desired-velocity formulation: each behavior
//! computes a desired velocity at `max_speed` and returns the difference to
//! the current velocity. Callers sum weighted contributions, clamp the total
//! to the agent's force budget, and hand it to the kinematic body.

use glam::Vec2;
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Lookahead, in seconds, used when predicting a quarry's position for
/// pursuit and evasion. Deliberately independent of the per-agent
/// containment lookahead.
pub const PURSUIT_LOOKAHEAD: f32 = 4.0;

/// Point-mass view of an agent, copied out for steering math.
///
/// All behaviors are pure functions of this snapshot, which keeps them free
/// of borrows into the world while the caller accumulates forces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mover {
    /// Current position.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Unit travel direction, or zero if the agent has never moved.
    pub heading: Vec2,
    /// Speed the desired velocity is scaled to.
    pub max_speed: f32,
}

impl Mover {
    /// Position this mover reaches after `lookahead` seconds at its current
    /// velocity.
    #[must_use]
    pub fn future_position(self, lookahead: f32) -> Vec2 {
        self.position + self.velocity * lookahead
    }

    /// Steers toward `target` at full speed.
    ///
    /// When `target` coincides with the current position the desired velocity
    /// degenerates to zero and the result is a pure braking force, never NaN.
    #[must_use]
    pub fn seek(self, target: Vec2) -> Vec2 {
        let desired = (target - self.position).normalize_or_zero() * self.max_speed;
        desired - self.velocity
    }

    /// Steers directly away from `target` at full speed.
    #[must_use]
    pub fn flee(self, target: Vec2) -> Vec2 {
        let desired = (self.position - target).normalize_or_zero() * self.max_speed;
        desired - self.velocity
    }

    /// Seeks the position the quarry will occupy [`PURSUIT_LOOKAHEAD`]
    /// seconds from now.
    #[must_use]
    pub fn pursue(self, quarry: Mover) -> Vec2 {
        self.seek(quarry.future_position(PURSUIT_LOOKAHEAD))
    }

    /// Flees the position the threat will occupy [`PURSUIT_LOOKAHEAD`]
    /// seconds from now.
    #[must_use]
    pub fn evade(self, threat: Mover) -> Vec2 {
        self.flee(threat.future_position(PURSUIT_LOOKAHEAD))
    }

    /// Steers back toward the world center once the predicted position leaves
    /// the play area, and stays neutral while it remains inside.
    #[must_use]
    pub fn stay_in_bounds(self, lookahead: f32, half_extent: Vec2) -> Vec2 {
        let future = self.future_position(lookahead);
        if future.x.abs() > half_extent.x || future.y.abs() > half_extent.y {
            self.seek(Vec2::ZERO)
        } else {
            Vec2::ZERO
        }
    }
}

/// Persistent wander jitter carried by each agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WanderState {
    /// Current wander angle, radians.
    pub angle: f32,
    /// Upper bound on angular drift, radians per second.
    pub max_turn_rate: f32,
}

impl WanderState {
    /// Fresh wander state with no accumulated angle.
    #[must_use]
    pub fn new(max_turn_rate: f32) -> Self {
        Self {
            angle: 0.0,
            max_turn_rate,
        }
    }

    /// Advances the wander angle by a bounded random delta and seeks a point
    /// one unit ahead of the agent, rotated by that angle off the current
    /// travel direction.
    ///
    /// The accumulated angle is clamped to the same per-tick bound as the
    /// delta, so the wander direction recenters quickly instead of winding
    /// up. The rotation applies to the normalized velocity, not the retained
    /// heading, so an agent at rest receives no wander force.
    pub fn steer(&mut self, mover: Mover, rng: &mut SmallRng, dt: f32) -> Vec2 {
        let max_change = self.max_turn_rate * dt;
        self.angle += rng.random_range(-max_change..=max_change);
        self.angle = self.angle.clamp(-max_change, max_change);
        let forward = mover.velocity.normalize_or_zero();
        let target = mover.position + Vec2::from_angle(self.angle).rotate(forward);
        mover.seek(target)
    }
}
