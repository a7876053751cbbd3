//! Agent kinds and the per-kind behavior state machines.

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::AgentId;
use crate::body::KinematicBody;
use crate::config::MotionParams;
use crate::steering::{Mover, WanderState};

/// Closed set of agent kinds the world can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Asteroid,
    Ship,
    Planet,
    Wanderer,
}

/// Mission phase of a drill ship.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipPhase {
    /// Flying out, looking for a planet to mine.
    #[default]
    Depart,
    /// Parked on a planet, filling up.
    Drill,
    /// Hauling full cargo toward an exit point on the world edge.
    Return,
}

/// Cargo ladder a ship climbs while drilling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CargoFill {
    #[default]
    Empty,
    Low,
    High,
    Full,
}

impl CargoFill {
    /// Fill level reached `progress` seconds into a drill run of
    /// `drill_time` seconds. The ladder steps at 30%, 60%, and 90%.
    #[must_use]
    pub fn from_progress(progress: f32, drill_time: f32) -> Self {
        if progress <= drill_time * 0.3 {
            Self::Empty
        } else if progress <= drill_time * 0.6 {
            Self::Low
        } else if progress <= drill_time * 0.9 {
            Self::High
        } else {
            Self::Full
        }
    }
}

/// Mutable mission state of a drill ship.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShipState {
    /// Current mission phase.
    pub phase: ShipPhase,
    /// Planet the ship is steering toward or parked on. Non-owning: the
    /// handle may go stale, and lookups then simply miss.
    pub target_planet: Option<AgentId>,
    /// Seconds spent drilling in the current visit.
    pub drill_progress: f32,
    /// Position the ship is pinned to while drilling.
    pub land_pos: Vec2,
    /// Edge point the ship hauls its cargo toward.
    pub return_pos: Vec2,
    /// How full the cargo hold is.
    pub cargo: CargoFill,
}

/// Occupancy bookkeeping for a planet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlanetState {
    /// Ships currently drilling here. Handles, not owners.
    pub drilling: Vec<AgentId>,
}

impl PlanetState {
    /// A busy planet hosts at least one drilling ship and refuses removal.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.drilling.is_empty()
    }
}

/// Kind-specific behavior state attached to an agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Asteroid,
    Ship(ShipState),
    Planet(PlanetState),
    Wanderer,
}

impl Behavior {
    /// Kind tag for this behavior.
    #[must_use]
    pub fn kind(&self) -> AgentKind {
        match self {
            Self::Asteroid => AgentKind::Asteroid,
            Self::Ship(_) => AgentKind::Ship,
            Self::Planet(_) => AgentKind::Planet,
            Self::Wanderer => AgentKind::Wanderer,
        }
    }
}

/// Complete per-agent record stored in the world arena.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    /// Position in world space.
    pub position: Vec2,
    /// Kinematic state advanced each tick.
    pub body: KinematicBody,
    /// Motion limits copied from the configuration at spawn.
    pub motion: MotionParams,
    /// Wander jitter state.
    pub wander: WanderState,
    /// Kind-specific behavior state.
    pub behavior: Behavior,
}

impl AgentRecord {
    /// Builds a freshly spawned agent: a unit velocity in a random direction
    /// plus whatever spawn impulses the motion block enables.
    pub fn spawn(
        position: Vec2,
        motion: MotionParams,
        behavior: Behavior,
        rng: &mut SmallRng,
    ) -> Self {
        let mut body = KinematicBody::new(&motion);
        body.set_velocity(Vec2::from_angle(rng.random_range(-PI..PI)));
        body.apply_spawn_impulses();
        Self {
            position,
            body,
            motion,
            wander: WanderState::new(motion.max_turn_rate),
            behavior,
        }
    }

    /// Kind tag for this agent.
    #[must_use]
    pub fn kind(&self) -> AgentKind {
        self.behavior.kind()
    }

    /// Collision radius from the motion block.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.motion.radius
    }

    /// Steering snapshot of this agent.
    #[must_use]
    pub fn mover(&self) -> Mover {
        Mover {
            position: self.position,
            velocity: self.body.velocity(),
            heading: self.body.heading(),
            max_speed: self.motion.max_speed,
        }
    }
}
