//! Core simulation for a bounded 2D world of autonomous steering agents.
//!
//! The world hosts four agent kinds: asteroids that wander and drift toward
//! planets, drill ships that fly out to planets, mine them, and haul cargo off
//! the map, stationary planets, and free-roaming wanderers. Everything runs on
//! a fixed pipeline per [`World::step`]: steering forces, clamped by a force
//! budget, feed semi-implicit Euler integration, then boundary and collision
//! checks recycle agents that left the play area or collided.
//!
//! Agents live in a generational slot map, so handles stay cheap to copy and
//! lookups on despawned agents simply return `None` instead of dangling. Runs
//! are reproducible: seed the RNG through [`SimConfig::rng_seed`] and two
//! worlds with the same configuration produce identical tick histories.

mod agent;
mod body;
mod config;
mod steering;
mod world;

pub use glam::Vec2;

pub use agent::{AgentKind, AgentRecord, Behavior, CargoFill, PlanetState, ShipPhase, ShipState};
pub use body::KinematicBody;
pub use config::{
    AsteroidParams, MotionParams, PlanetParams, ShipParams, SimConfig, WandererParams, WorldError,
};
pub use steering::{Mover, PURSUIT_LOOKAHEAD, WanderState};
pub use world::{TickSummary, World, WorldBounds};

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to an agent stored in the world arena.
    ///
    /// Handles are generational: once the agent despawns, lookups with the
    /// stale handle return `None` rather than aliasing a recycled slot.
    pub struct AgentId;
}

/// Convenience alias for sidecar data keyed by agent handle.
pub type AgentMap<T> = slotmap::SecondaryMap<AgentId, T>;

/// Monotonic simulation clock, counted in completed steps.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the tick following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Tick zero, before any step has run.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}
