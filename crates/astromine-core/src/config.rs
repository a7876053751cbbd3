//! Simulation configuration, validation, and RNG seeding.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced while constructing or reconfiguring a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Configuration failed validation before the world was built.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Motion limits and physical shape shared by every agent kind.
///
/// Friction and gravity are one-shot spawn impulses rather than continuous
/// forces: when enabled they are applied once to the freshly spawned body,
/// matching the impulse-at-birth model the rest of the pipeline assumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Upper bound on speed, world units per second.
    pub max_speed: f32,
    /// Upper bound on the magnitude of the summed steering force per tick.
    pub max_force: f32,
    /// Seconds of lookahead used when predicting positions for containment.
    pub future_time: f32,
    /// Upper bound on wander-angle drift, radians per second.
    pub max_turn_rate: f32,
    /// Collision radius, world units.
    pub radius: f32,
    /// Personal-space radius. Kept as a tuning surface; the shipborne
    /// separation force uses [`ShipParams::ship_separate_distance`] instead.
    pub space_radius: f32,
    /// Mass dividing applied forces into acceleration.
    pub mass: f32,
    /// Whether a friction impulse is applied at spawn.
    pub use_friction: bool,
    /// Friction impulse magnitude, opposing the spawn velocity.
    pub friction_coefficient: f32,
    /// Whether a downward gravity impulse is applied at spawn.
    pub use_gravity: bool,
}

impl MotionParams {
    fn validate(&self, label: &'static str) -> Result<(), WorldError> {
        if self.max_speed <= 0.0
            || self.max_force <= 0.0
            || self.mass <= 0.0
            || self.radius <= 0.0
        {
            return Err(WorldError::InvalidConfig(label));
        }
        if self.future_time < 0.0
            || self.max_turn_rate < 0.0
            || self.space_radius < 0.0
            || self.friction_coefficient < 0.0
        {
            return Err(WorldError::InvalidConfig(label));
        }
        Ok(())
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            max_force: 5.0,
            future_time: 2.0,
            max_turn_rate: 10.0_f32.to_radians(),
            radius: 0.5,
            space_radius: 1.0,
            mass: 1.0,
            use_friction: false,
            friction_coefficient: 0.0,
            use_gravity: false,
        }
    }
}

/// Tuning for the asteroid population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidParams {
    /// Shared motion limits.
    pub motion: MotionParams,
    /// Planets farther than this do not attract the asteroid.
    pub max_planet_distance: f32,
    /// Weight on the wander contribution.
    pub wander_weight: f32,
    /// Weight on the planet-attraction contribution.
    pub gravitate_weight: f32,
}

impl Default for AsteroidParams {
    fn default() -> Self {
        Self {
            motion: MotionParams {
                radius: 0.58,
                ..MotionParams::default()
            },
            max_planet_distance: 5.0,
            wander_weight: 1.0,
            gravitate_weight: 1.0,
        }
    }
}

/// Tuning for the drill ship population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipParams {
    /// Shared motion limits.
    pub motion: MotionParams,
    /// Seconds a ship spends drilling before its cargo is full.
    pub drill_time: f32,
    /// Planets beyond this distance are ignored when picking a target.
    pub planet_seek_distance: f32,
    /// Asteroids inside this distance trigger the evasion force.
    pub asteroid_avoid_distance: f32,
    /// Other ships inside this distance trigger the separation force.
    pub ship_separate_distance: f32,
    /// Weight on the planet-seek contribution while departing.
    pub seek_weight: f32,
    /// Weight on the asteroid-evasion contribution.
    pub avoid_weight: f32,
    /// Weight on the ship-separation contribution.
    pub separate_weight: f32,
}

impl Default for ShipParams {
    fn default() -> Self {
        Self {
            motion: MotionParams::default(),
            drill_time: 10.0,
            planet_seek_distance: 12.0,
            asteroid_avoid_distance: 4.0,
            ship_separate_distance: 2.0,
            seek_weight: 1.0,
            avoid_weight: 1.0,
            separate_weight: 1.0,
        }
    }
}

/// Tuning for planets. Planets are stationary, so of the motion block only
/// the radius participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanetParams {
    /// Shared motion limits.
    pub motion: MotionParams,
}

impl Default for PlanetParams {
    fn default() -> Self {
        Self {
            motion: MotionParams {
                radius: 1.69,
                ..MotionParams::default()
            },
        }
    }
}

/// Tuning for the generic wanderer population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WandererParams {
    /// Shared motion limits.
    pub motion: MotionParams,
}

impl Default for WandererParams {
    fn default() -> Self {
        Self {
            motion: MotionParams::default(),
        }
    }
}

/// Static configuration for a simulation world.
///
/// Defaults reproduce the reference scenario: a 40x40 play area with ten
/// asteroids, one drill ship, two starting planets, and room for ten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Half-extent of the play area on the X axis, world units.
    pub half_width: f32,
    /// Half-extent of the play area on the Y axis, world units.
    pub half_height: f32,
    /// Number of asteroids the world keeps alive.
    pub asteroid_target: usize,
    /// Number of drill ships the world keeps alive.
    pub ship_target: usize,
    /// Planets spawned when the world boots.
    pub planet_initial: usize,
    /// Hard cap on concurrently live planets.
    pub planet_limit: usize,
    /// Wanderers spawned when the world boots. They never despawn, so the
    /// population is seeded once and not replenished.
    pub wanderer_initial: usize,
    /// Optional RNG seed. `None` seeds from entropy, making runs unique.
    pub rng_seed: Option<u64>,
    /// Number of recent tick summaries retained in memory.
    pub history_capacity: usize,
    /// Asteroid tuning block.
    pub asteroid: AsteroidParams,
    /// Drill ship tuning block.
    pub ship: ShipParams,
    /// Planet tuning block.
    pub planet: PlanetParams,
    /// Wanderer tuning block.
    pub wanderer: WandererParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            half_width: 20.0,
            half_height: 20.0,
            asteroid_target: 10,
            ship_target: 1,
            planet_initial: 2,
            planet_limit: 10,
            wanderer_initial: 0,
            rng_seed: None,
            history_capacity: 512,
            asteroid: AsteroidParams::default(),
            ship: ShipParams::default(),
            planet: PlanetParams::default(),
            wanderer: WandererParams::default(),
        }
    }
}

impl SimConfig {
    /// Checks the configuration for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.half_width <= 0.0 || self.half_height <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "world half-extents must be positive",
            ));
        }
        if self.planet_initial > self.planet_limit {
            return Err(WorldError::InvalidConfig(
                "initial planet count exceeds the planet limit",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history capacity must be at least one",
            ));
        }
        self.asteroid
            .motion
            .validate("asteroid motion limits out of range")?;
        self.ship.motion.validate("ship motion limits out of range")?;
        self.planet
            .motion
            .validate("planet motion limits out of range")?;
        self.wanderer
            .motion
            .validate("wanderer motion limits out of range")?;
        if self.ship.drill_time <= 0.0 {
            return Err(WorldError::InvalidConfig("drill time must be positive"));
        }
        if self.ship.planet_seek_distance < 0.0
            || self.ship.asteroid_avoid_distance < 0.0
            || self.ship.ship_separate_distance < 0.0
        {
            return Err(WorldError::InvalidConfig(
                "ship interaction distances must be non-negative",
            ));
        }
        if self.asteroid.max_planet_distance < 0.0 {
            return Err(WorldError::InvalidConfig(
                "asteroid planet-attraction distance must be non-negative",
            ));
        }
        Ok(())
    }

    /// Builds the world RNG, honoring [`SimConfig::rng_seed`] when set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        SimConfig::default()
            .validate()
            .expect("default configuration must be usable");
    }

    #[test]
    fn rejects_non_positive_world_extent() {
        let config = SimConfig {
            half_width: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WorldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_initial_planets_beyond_limit() {
        let config = SimConfig {
            planet_initial: 11,
            planet_limit: 10,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_drill_time() {
        let mut config = SimConfig::default();
        config.ship.drill_time = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_motion_limits() {
        let mut config = SimConfig::default();
        config.asteroid.motion.max_speed = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;

        let config = SimConfig {
            rng_seed: Some(99),
            ..SimConfig::default()
        };
        let mut a = config.seeded_rng();
        let mut b = config.seeded_rng();
        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }
}
