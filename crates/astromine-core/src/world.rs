//! World state: the agent arena, lifecycle bookkeeping, and the per-tick
//! simulation pipeline.

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use ordered_float::OrderedFloat;
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::agent::{AgentKind, AgentRecord, Behavior, CargoFill, PlanetState, ShipPhase, ShipState};
use crate::config::{SimConfig, WorldError};
use crate::steering::Mover;
use crate::{AgentId, AgentMap, Tick};

/// Origin-centered rectangular play area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Half-extent on the X axis.
    pub half_width: f32,
    /// Half-extent on the Y axis.
    pub half_height: f32,
}

impl WorldBounds {
    /// Bounds with the given half-extents.
    #[must_use]
    pub const fn new(half_width: f32, half_height: f32) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    /// Half-extents as a vector, for the containment steering force.
    #[must_use]
    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(self.half_width, self.half_height)
    }

    /// True while `point` lies inside the bounds, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x.abs() <= self.half_width && point.y.abs() <= self.half_height
    }

    /// True once `point` sits more than `margin` beyond the bounds on either
    /// axis.
    #[must_use]
    pub fn is_outside(&self, point: Vec2, margin: f32) -> bool {
        point.x.abs() > self.half_width + margin || point.y.abs() > self.half_height + margin
    }

    /// Uniformly picks one of the four boundary edges, then a uniform point
    /// along it.
    pub fn random_edge_point(&self, rng: &mut SmallRng) -> Vec2 {
        match rng.random_range(0u8..4) {
            0 => Vec2::new(
                rng.random_range(-self.half_width..=self.half_width),
                self.half_height,
            ),
            1 => Vec2::new(
                rng.random_range(-self.half_width..=self.half_width),
                -self.half_height,
            ),
            2 => Vec2::new(
                -self.half_width,
                rng.random_range(-self.half_height..=self.half_height),
            ),
            _ => Vec2::new(
                self.half_width,
                rng.random_range(-self.half_height..=self.half_height),
            ),
        }
    }

    /// Uniform point inside the bounds.
    pub fn random_interior_point(&self, rng: &mut SmallRng) -> Vec2 {
        Vec2::new(
            rng.random_range(-self.half_width..=self.half_width),
            rng.random_range(-self.half_height..=self.half_height),
        )
    }
}

/// Observable result of one [`World::step`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Clock value after the step completed.
    pub tick: Tick,
    /// Live asteroids at the end of the step.
    pub asteroids: usize,
    /// Live drill ships at the end of the step.
    pub ships: usize,
    /// Live planets at the end of the step.
    pub planets: usize,
    /// Live wanderers at the end of the step.
    pub wanderers: usize,
    /// Agents spawned by the replenish stage this step.
    pub spawned: usize,
    /// Agents removed by the despawn stage this step.
    pub despawned: usize,
    /// Cargo deliveries completed this step.
    pub delivered: usize,
    /// Cargo deliveries completed since boot (or the last counter reset).
    pub total_delivered: u64,
}

/// A bounded world of steering agents, advanced one tick at a time.
///
/// Agents are stored in a generational arena; per-kind rosters keep the
/// update and query order stable. All randomness flows through one seeded
/// RNG, so a seeded configuration replays identically.
#[derive(Debug)]
pub struct World {
    config: SimConfig,
    bounds: WorldBounds,
    rng: SmallRng,
    clock: Tick,
    agents: SlotMap<AgentId, AgentRecord>,
    asteroids: Vec<AgentId>,
    ships: Vec<AgentId>,
    planets: Vec<AgentId>,
    wanderers: Vec<AgentId>,
    /// Agents marked dead during the current step; removed at the end of the
    /// step so queries never observe a half-removed agent mid-iteration.
    pending_despawns: Vec<AgentId>,
    delivered_this_tick: usize,
    total_delivered: u64,
    history: VecDeque<TickSummary>,
}

impl World {
    /// Builds a world and seeds its initial population at random interior
    /// positions.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let bounds = WorldBounds::new(config.half_width, config.half_height);
        let rng = config.seeded_rng();
        let history = VecDeque::with_capacity(config.history_capacity);
        let mut world = Self {
            bounds,
            rng,
            clock: Tick::zero(),
            agents: SlotMap::with_key(),
            asteroids: Vec::new(),
            ships: Vec::new(),
            planets: Vec::new(),
            wanderers: Vec::new(),
            pending_despawns: Vec::new(),
            delivered_this_tick: 0,
            total_delivered: 0,
            history,
            config,
        };
        world.seed_population();
        Ok(world)
    }

    fn seed_population(&mut self) {
        for _ in 0..self.config.asteroid_target {
            let position = self.bounds.random_interior_point(&mut self.rng);
            self.spawn_asteroid(position);
        }
        for _ in 0..self.config.planet_initial {
            let position = self.bounds.random_interior_point(&mut self.rng);
            self.spawn_planet(position);
        }
        for _ in 0..self.config.ship_target {
            let position = self.bounds.random_interior_point(&mut self.rng);
            self.spawn_ship(position);
        }
        for _ in 0..self.config.wanderer_initial {
            let position = self.bounds.random_interior_point(&mut self.rng);
            self.spawn_wanderer(position);
        }
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Play-area bounds.
    #[must_use]
    pub const fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Completed steps since boot.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.clock
    }

    /// Number of live agents across all kinds.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Handles of all live agents of `kind`, in stable update order.
    #[must_use]
    pub fn ids_of(&self, kind: AgentKind) -> &[AgentId] {
        match kind {
            AgentKind::Asteroid => &self.asteroids,
            AgentKind::Ship => &self.ships,
            AgentKind::Planet => &self.planets,
            AgentKind::Wanderer => &self.wanderers,
        }
    }

    /// Looks up a live agent. Stale handles return `None`.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        self.agents.get(id)
    }

    /// Mutable lookup, mainly for hosts and tests that stage scenarios.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut AgentRecord> {
        self.agents.get_mut(id)
    }

    /// Snapshot of every live agent's position, keyed by handle.
    #[must_use]
    pub fn positions(&self) -> AgentMap<Vec2> {
        let mut positions = AgentMap::new();
        for (id, record) in &self.agents {
            positions.insert(id, record.position);
        }
        positions
    }

    /// Cargo deliveries completed since boot or the last reset.
    #[must_use]
    pub const fn total_delivered(&self) -> u64 {
        self.total_delivered
    }

    /// Resets the delivery counter to zero.
    pub fn reset_delivery_counter(&mut self) {
        self.total_delivered = 0;
    }

    /// Recent per-step summaries, oldest first, bounded by
    /// [`SimConfig::history_capacity`].
    #[must_use]
    pub fn history(&self) -> &VecDeque<TickSummary> {
        &self.history
    }

    /// Uniform point on the play-area boundary, drawn from the world RNG.
    pub fn random_edge_point(&mut self) -> Vec2 {
        self.bounds.random_edge_point(&mut self.rng)
    }

    /// Spawns an asteroid at `position` with a random unit velocity.
    pub fn spawn_asteroid(&mut self, position: Vec2) -> AgentId {
        let record = AgentRecord::spawn(
            position,
            self.config.asteroid.motion,
            Behavior::Asteroid,
            &mut self.rng,
        );
        self.insert(record)
    }

    /// Spawns a drill ship at `position`, starting in the Depart phase.
    pub fn spawn_ship(&mut self, position: Vec2) -> AgentId {
        let record = AgentRecord::spawn(
            position,
            self.config.ship.motion,
            Behavior::Ship(ShipState::default()),
            &mut self.rng,
        );
        self.insert(record)
    }

    /// Spawns a wanderer at `position`.
    pub fn spawn_wanderer(&mut self, position: Vec2) -> AgentId {
        let record = AgentRecord::spawn(
            position,
            self.config.wanderer.motion,
            Behavior::Wanderer,
            &mut self.rng,
        );
        self.insert(record)
    }

    /// Places a planet at `position`, or returns `None` once the planet
    /// limit is reached.
    pub fn place_planet(&mut self, position: Vec2) -> Option<AgentId> {
        if self.planets.len() >= self.config.planet_limit {
            return None;
        }
        Some(self.spawn_planet(position))
    }

    fn spawn_planet(&mut self, position: Vec2) -> AgentId {
        let record = AgentRecord::spawn(
            position,
            self.config.planet.motion,
            Behavior::Planet(PlanetState::default()),
            &mut self.rng,
        );
        self.insert(record)
    }

    fn insert(&mut self, record: AgentRecord) -> AgentId {
        let kind = record.kind();
        let id = self.agents.insert(record);
        match kind {
            AgentKind::Asteroid => self.asteroids.push(id),
            AgentKind::Ship => self.ships.push(id),
            AgentKind::Planet => self.planets.push(id),
            AgentKind::Wanderer => self.wanderers.push(id),
        }
        id
    }

    /// Removes a planet unless it is busy hosting drilling ships. Returns
    /// whether the planet was removed.
    pub fn remove_planet(&mut self, id: AgentId) -> bool {
        match self.agents.get(id) {
            Some(record) => match &record.behavior {
                Behavior::Planet(state) if !state.is_busy() => self.despawn(id),
                _ => false,
            },
            None => false,
        }
    }

    /// Removes an agent immediately. Idempotent: a stale handle is a no-op
    /// returning `false`.
    ///
    /// Cross-references are kept coherent: a despawned drilling ship leaves
    /// its planet's roster, and ships that lose their planet fall back to the
    /// Depart phase.
    pub fn despawn(&mut self, id: AgentId) -> bool {
        let Some(record) = self.agents.remove(id) else {
            return false;
        };
        match record.kind() {
            AgentKind::Asteroid => self.asteroids.retain(|&h| h != id),
            AgentKind::Ship => self.ships.retain(|&h| h != id),
            AgentKind::Planet => self.planets.retain(|&h| h != id),
            AgentKind::Wanderer => self.wanderers.retain(|&h| h != id),
        }
        match record.behavior {
            Behavior::Ship(state) => {
                if state.phase == ShipPhase::Drill
                    && let Some(planet_id) = state.target_planet
                    && let Some(planet) = self.agents.get_mut(planet_id)
                    && let Behavior::Planet(planet_state) = &mut planet.behavior
                {
                    planet_state.drilling.retain(|&ship| ship != id);
                }
            }
            Behavior::Planet(state) => {
                for ship_id in state.drilling {
                    if let Some(ship) = self.agents.get_mut(ship_id)
                        && let Behavior::Ship(ship_state) = &mut ship.behavior
                    {
                        ship_state.phase = ShipPhase::Depart;
                        ship_state.target_planet = None;
                        ship_state.drill_progress = 0.0;
                        ship_state.cargo = CargoFill::Empty;
                    }
                }
            }
            Behavior::Asteroid | Behavior::Wanderer => {}
        }
        true
    }

    /// Advances the simulation by one tick of `dt` seconds.
    ///
    /// Stage order: replenish destroyed asteroids and ships at the world
    /// edge, update every agent sequentially (forces, clamp, integrate,
    /// lifecycle checks), then commit deferred despawns. Agents read each
    /// other's interleaved in-tick state, in update order: asteroids,
    /// planets, ships, wanderers.
    pub fn step(&mut self, dt: f32) -> TickSummary {
        self.delivered_this_tick = 0;
        let spawned = self.stage_replenish();
        self.stage_agents(dt);
        let despawned = self.stage_despawn_commit();
        self.clock = self.clock.next();

        let summary = TickSummary {
            tick: self.clock,
            asteroids: self.asteroids.len(),
            ships: self.ships.len(),
            planets: self.planets.len(),
            wanderers: self.wanderers.len(),
            spawned,
            despawned,
            delivered: self.delivered_this_tick,
            total_delivered: self.total_delivered,
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());
        summary
    }

    /// Tops the asteroid and ship populations back up to their configured
    /// targets, spawning replacements on the world edge.
    fn stage_replenish(&mut self) -> usize {
        let mut spawned = 0;
        while self.asteroids.len() < self.config.asteroid_target {
            let position = self.bounds.random_edge_point(&mut self.rng);
            self.spawn_asteroid(position);
            spawned += 1;
        }
        while self.ships.len() < self.config.ship_target {
            let position = self.bounds.random_edge_point(&mut self.rng);
            self.spawn_ship(position);
            spawned += 1;
        }
        spawned
    }

    fn stage_agents(&mut self, dt: f32) {
        // Roster snapshot: spawns land next tick, despawns are deferred, so
        // every id here stays valid for the whole stage.
        let order: Vec<AgentId> = self
            .asteroids
            .iter()
            .chain(self.planets.iter())
            .chain(self.ships.iter())
            .chain(self.wanderers.iter())
            .copied()
            .collect();
        for id in order {
            self.update_agent(id, dt);
        }
    }

    fn update_agent(&mut self, id: AgentId, dt: f32) {
        let Some(record) = self.agents.get(id) else {
            return;
        };
        match record.kind() {
            AgentKind::Asteroid => self.update_asteroid(id, dt),
            AgentKind::Ship => self.update_ship(id, dt),
            AgentKind::Planet => self.update_planet(id, dt),
            AgentKind::Wanderer => self.update_wanderer(id, dt),
        }
    }

    fn update_asteroid(&mut self, id: AgentId, dt: f32) {
        let params = self.config.asteroid;
        let Some(record) = self.agents.get(id) else {
            return;
        };
        let mover = record.mover();
        let gravitate = self.gravitate_to_planets(mover, params.max_planet_distance);

        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        let wander = record.wander.steer(mover, &mut self.rng, dt);
        let total = (wander * params.wander_weight + gravitate * params.gravitate_weight)
            .clamp_length_max(record.motion.max_force);
        record.body.apply_force(total);
        record.body.integrate(&mut record.position, dt);

        let position = record.position;
        let radius = record.motion.radius;
        if self.bounds.is_outside(position, radius) || self.collides_with_planet(position, radius)
        {
            self.pending_despawns.push(id);
        }
    }

    fn update_planet(&mut self, id: AgentId, dt: f32) {
        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        record.body.set_velocity(Vec2::ZERO);
        record.body.integrate(&mut record.position, dt);
        if !self.bounds.contains(record.position) {
            self.pending_despawns.push(id);
        }
    }

    fn update_wanderer(&mut self, id: AgentId, dt: f32) {
        let half_extent = self.bounds.half_extent();
        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        let mover = record.mover();
        let wander = record.wander.steer(mover, &mut self.rng, dt);
        let contain = mover.stay_in_bounds(record.motion.future_time, half_extent);
        let total = (wander + contain).clamp_length_max(record.motion.max_force);
        record.body.apply_force(total);
        record.body.integrate(&mut record.position, dt);
        // Wanderers are contained by steering alone, never despawned.
    }

    fn update_ship(&mut self, id: AgentId, dt: f32) {
        let Some(record) = self.agents.get(id) else {
            return;
        };
        let Behavior::Ship(state) = &record.behavior else {
            return;
        };
        match state.phase {
            ShipPhase::Depart => self.update_ship_depart(id, dt),
            ShipPhase::Drill => self.update_ship_drill(id, dt),
            ShipPhase::Return => self.update_ship_return(id, dt),
        }
    }

    fn update_ship_depart(&mut self, id: AgentId, dt: f32) {
        let params = self.config.ship;
        let Some(record) = self.agents.get(id) else {
            return;
        };
        let mover = record.mover();

        let target = self.scan_target_planet(mover.position, params.planet_seek_distance);
        let avoid = self.avoid_asteroids(mover, params.asteroid_avoid_distance);
        let separate = self.avoid_ships(id, mover, params.ship_separate_distance);

        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        let mut total = match target {
            Some((planet_id, planet_pos)) => {
                if let Behavior::Ship(state) = &mut record.behavior {
                    state.target_planet = Some(planet_id);
                }
                mover.seek(planet_pos) * params.seek_weight
            }
            None => record.wander.steer(mover, &mut self.rng, dt),
        };
        total += avoid * params.avoid_weight + separate * params.separate_weight;
        let total = total.clamp_length_max(record.motion.max_force);
        record.body.apply_force(total);
        record.body.integrate(&mut record.position, dt);

        self.check_ship_edge(id);
        self.try_land(id);
        // Landing does not shield the ship this tick; an asteroid already on
        // the landing point still destroys it. Established Drill ticks skip
        // the check entirely.
        if self.hit_by_asteroid(id) {
            self.pending_despawns.push(id);
        }
    }

    fn update_ship_drill(&mut self, id: AgentId, dt: f32) {
        let drill_time = self.config.ship.drill_time;
        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        record.body.set_velocity(Vec2::ZERO);
        record.body.integrate(&mut record.position, dt);

        let Behavior::Ship(state) = &mut record.behavior else {
            return;
        };
        // The pin wins over whatever integration produced.
        record.position = state.land_pos;
        state.drill_progress += dt;
        state.cargo = CargoFill::from_progress(state.drill_progress, drill_time);

        let mut finished_planet = None;
        if state.drill_progress >= drill_time {
            state.phase = ShipPhase::Return;
            state.cargo = CargoFill::Full;
            state.drill_progress = 0.0;
            state.return_pos = self.bounds.random_edge_point(&mut self.rng);
            finished_planet = state.target_planet.take();
        }

        if let Some(planet_id) = finished_planet
            && let Some(planet) = self.agents.get_mut(planet_id)
            && let Behavior::Planet(planet_state) = &mut planet.behavior
        {
            planet_state.drilling.retain(|&ship| ship != id);
        }
    }

    fn update_ship_return(&mut self, id: AgentId, dt: f32) {
        let params = self.config.ship;
        let Some(record) = self.agents.get(id) else {
            return;
        };
        let mover = record.mover();
        let return_pos = match &record.behavior {
            Behavior::Ship(state) => state.return_pos,
            _ => return,
        };

        let avoid = self.avoid_asteroids(mover, params.asteroid_avoid_distance);
        let separate = self.avoid_ships(id, mover, params.ship_separate_distance);

        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        let total = (mover.seek(return_pos * 2.0)
            + avoid * params.avoid_weight
            + separate * params.separate_weight)
            .clamp_length_max(record.motion.max_force);
        record.body.apply_force(total);
        record.body.integrate(&mut record.position, dt);

        self.check_ship_edge(id);
        if self.hit_by_asteroid(id) {
            self.pending_despawns.push(id);
        }
    }

    /// Sum of seek forces toward every planet ahead of the mover's heading
    /// and within `max_distance`.
    fn gravitate_to_planets(&self, mover: Mover, max_distance: f32) -> Vec2 {
        let range_squared = max_distance * max_distance;
        let mut attract = Vec2::ZERO;
        for &planet_id in &self.planets {
            let Some(planet) = self.agents.get(planet_id) else {
                continue;
            };
            let to_planet = planet.position - mover.position;
            if to_planet.dot(mover.heading) < 0.0 {
                continue;
            }
            if to_planet.length_squared() < range_squared {
                attract += mover.seek(planet.position);
            }
        }
        attract
    }

    /// Picks the in-range planet to fly toward. Selects the farthest planet
    /// still within `seek_distance`, which keeps ships touring the map
    /// instead of circling the nearest rock.
    fn scan_target_planet(&self, position: Vec2, seek_distance: f32) -> Option<(AgentId, Vec2)> {
        let range_squared = seek_distance * seek_distance;
        self.planets
            .iter()
            .filter_map(|&planet_id| {
                let planet = self.agents.get(planet_id)?;
                let dist_squared = planet.position.distance_squared(position);
                (dist_squared <= range_squared)
                    .then_some((OrderedFloat(dist_squared), planet_id, planet.position))
            })
            .max_by_key(|&(dist_squared, _, _)| dist_squared)
            .map(|(_, planet_id, planet_pos)| (planet_id, planet_pos))
    }

    /// Summed evade forces away from asteroids ahead of the mover's heading
    /// and within `avoid_distance`.
    fn avoid_asteroids(&self, mover: Mover, avoid_distance: f32) -> Vec2 {
        let range_squared = avoid_distance * avoid_distance;
        let mut force = Vec2::ZERO;
        for &asteroid_id in &self.asteroids {
            let Some(asteroid) = self.agents.get(asteroid_id) else {
                continue;
            };
            let to_asteroid = asteroid.position - mover.position;
            if to_asteroid.dot(mover.heading) < 0.0 {
                continue;
            }
            if to_asteroid.length_squared() < range_squared {
                force += mover.evade(asteroid.mover());
            }
        }
        force
    }

    /// Summed evade forces away from every other ship within
    /// `separate_distance`, regardless of heading.
    fn avoid_ships(&self, self_id: AgentId, mover: Mover, separate_distance: f32) -> Vec2 {
        let range_squared = separate_distance * separate_distance;
        let mut force = Vec2::ZERO;
        for &ship_id in &self.ships {
            if ship_id == self_id {
                continue;
            }
            let Some(other) = self.agents.get(ship_id) else {
                continue;
            };
            if other.position.distance_squared(mover.position) < range_squared {
                force += mover.evade(other.mover());
            }
        }
        force
    }

    fn collides_with_planet(&self, position: Vec2, radius: f32) -> bool {
        self.planets
            .iter()
            .filter_map(|&planet_id| self.agents.get(planet_id))
            .any(|planet| {
                let reach = planet.motion.radius + radius * 0.5;
                planet.position.distance_squared(position) < reach * reach
            })
    }

    /// Lands the ship on the first planet it touches, entering the Drill
    /// phase: velocity zeroed, heading flipped outward, position pinned, and
    /// the ship registered in the planet's drilling roster.
    fn try_land(&mut self, id: AgentId) {
        let Some(record) = self.agents.get(id) else {
            return;
        };
        let position = record.position;
        let radius = record.motion.radius;
        let mut landing = None;
        for &planet_id in &self.planets {
            let Some(planet) = self.agents.get(planet_id) else {
                continue;
            };
            let reach = planet.motion.radius + radius * 0.5;
            if planet.position.distance_squared(position) < reach * reach {
                landing = Some((planet_id, planet.position));
                break;
            }
        }
        let Some((planet_id, planet_pos)) = landing else {
            return;
        };

        let Some(record) = self.agents.get_mut(id) else {
            return;
        };
        record.body.set_velocity(Vec2::ZERO);
        record
            .body
            .set_heading((record.position - planet_pos).normalize_or_zero());
        let land_pos = record.position;
        if let Behavior::Ship(state) = &mut record.behavior {
            state.phase = ShipPhase::Drill;
            state.target_planet = Some(planet_id);
            state.land_pos = land_pos;
            state.drill_progress = 0.0;
        }

        if let Some(planet) = self.agents.get_mut(planet_id)
            && let Behavior::Planet(planet_state) = &mut planet.behavior
        {
            planet_state.drilling.push(id);
        }
    }

    fn hit_by_asteroid(&self, id: AgentId) -> bool {
        let Some(record) = self.agents.get(id) else {
            return false;
        };
        let radius_squared = record.motion.radius * record.motion.radius;
        self.asteroids
            .iter()
            .filter_map(|&asteroid_id| self.agents.get(asteroid_id))
            .any(|asteroid| {
                asteroid.position.distance_squared(record.position) < radius_squared
            })
    }

    /// Despawns a ship that flew beyond the bounds plus its radius, counting
    /// a delivery when it left with full cargo.
    fn check_ship_edge(&mut self, id: AgentId) {
        let Some(record) = self.agents.get(id) else {
            return;
        };
        if !self.bounds.is_outside(record.position, record.motion.radius) {
            return;
        }
        let delivered =
            matches!(&record.behavior, Behavior::Ship(state) if state.cargo == CargoFill::Full);
        if delivered {
            self.total_delivered += 1;
            self.delivered_this_tick += 1;
        }
        self.pending_despawns.push(id);
    }

    /// Commits deferred despawns, deduplicating marks from multiple checks in
    /// the same step.
    fn stage_despawn_commit(&mut self) -> usize {
        if self.pending_despawns.is_empty() {
            return 0;
        }
        let marks: Vec<AgentId> = self.pending_despawns.drain(..).collect();
        let mut seen = HashSet::with_capacity(marks.len());
        let mut removed = 0;
        for id in marks {
            if seen.insert(id) && self.despawn(id) {
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SimConfig {
        SimConfig {
            asteroid_target: 0,
            ship_target: 0,
            planet_initial: 0,
            wanderer_initial: 0,
            rng_seed: Some(42),
            ..SimConfig::default()
        }
    }

    #[test]
    fn boot_seeds_the_configured_population() {
        let config = SimConfig {
            rng_seed: Some(1),
            wanderer_initial: 3,
            ..SimConfig::default()
        };
        let world = World::new(config).expect("valid config");
        assert_eq!(world.ids_of(AgentKind::Asteroid).len(), 10);
        assert_eq!(world.ids_of(AgentKind::Planet).len(), 2);
        assert_eq!(world.ids_of(AgentKind::Ship).len(), 1);
        assert_eq!(world.ids_of(AgentKind::Wanderer).len(), 3);
        assert_eq!(world.agent_count(), 16);
    }

    #[test]
    fn boot_positions_stay_inside_the_bounds() {
        let world = World::new(SimConfig {
            rng_seed: Some(2),
            ..SimConfig::default()
        })
        .expect("valid config");
        let bounds = world.bounds();
        for (_, record) in world.agents.iter() {
            assert!(bounds.contains(record.position));
        }
    }

    #[test]
    fn despawn_is_idempotent_on_stale_handles() {
        let mut world = World::new(quiet_config()).expect("valid config");
        let id = world.spawn_asteroid(Vec2::ZERO);
        assert!(world.despawn(id));
        assert!(!world.despawn(id));
        assert!(world.agent(id).is_none());
        assert!(world.ids_of(AgentKind::Asteroid).is_empty());
    }

    #[test]
    fn place_planet_stops_at_the_limit() {
        let mut config = quiet_config();
        config.planet_limit = 2;
        let mut world = World::new(config).expect("valid config");
        assert!(world.place_planet(Vec2::new(1.0, 0.0)).is_some());
        assert!(world.place_planet(Vec2::new(2.0, 0.0)).is_some());
        assert!(world.place_planet(Vec2::new(3.0, 0.0)).is_none());
        assert_eq!(world.ids_of(AgentKind::Planet).len(), 2);
    }

    #[test]
    fn busy_planets_refuse_removal() {
        let mut world = World::new(quiet_config()).expect("valid config");
        let planet = world.place_planet(Vec2::ZERO).expect("below limit");
        let ship = world.spawn_ship(Vec2::new(30.0, 30.0));

        // Stage a drilling ship by hand.
        if let Behavior::Planet(state) = &mut world.agent_mut(planet).unwrap().behavior {
            state.drilling.push(ship);
        }
        if let Behavior::Ship(state) = &mut world.agent_mut(ship).unwrap().behavior {
            state.phase = ShipPhase::Drill;
            state.target_planet = Some(planet);
        }

        assert!(!world.remove_planet(planet));
        assert!(world.agent(planet).is_some());

        if let Behavior::Planet(state) = &mut world.agent_mut(planet).unwrap().behavior {
            state.drilling.clear();
        }
        assert!(world.remove_planet(planet));
        assert!(world.agent(planet).is_none());
    }

    #[test]
    fn despawning_a_busy_planet_releases_its_ships() {
        let mut world = World::new(quiet_config()).expect("valid config");
        let planet = world.place_planet(Vec2::ZERO).expect("below limit");
        let ship = world.spawn_ship(Vec2::new(1.0, 0.0));
        if let Behavior::Planet(state) = &mut world.agent_mut(planet).unwrap().behavior {
            state.drilling.push(ship);
        }
        if let Behavior::Ship(state) = &mut world.agent_mut(ship).unwrap().behavior {
            state.phase = ShipPhase::Drill;
            state.target_planet = Some(planet);
            state.drill_progress = 4.0;
        }

        assert!(world.despawn(planet));

        let Behavior::Ship(state) = &world.agent(ship).unwrap().behavior else {
            panic!("ship record lost its behavior");
        };
        assert_eq!(state.phase, ShipPhase::Depart);
        assert!(state.target_planet.is_none());
        assert_eq!(state.drill_progress, 0.0);
    }

    #[test]
    fn random_edge_points_land_on_the_boundary() {
        let mut world = World::new(quiet_config()).expect("valid config");
        let bounds = world.bounds();
        let mut seen_vertical = false;
        let mut seen_horizontal = false;
        for _ in 0..64 {
            let point = world.random_edge_point();
            let on_x_edge = (point.x.abs() - bounds.half_width).abs() < f32::EPSILON;
            let on_y_edge = (point.y.abs() - bounds.half_height).abs() < f32::EPSILON;
            assert!(
                on_x_edge || on_y_edge,
                "edge point {point} misses the boundary"
            );
            assert!(bounds.contains(point));
            seen_vertical |= on_x_edge;
            seen_horizontal |= on_y_edge;
        }
        assert!(seen_vertical && seen_horizontal, "sampling skipped edges");
    }

    #[test]
    fn step_summary_counts_match_the_rosters() {
        let mut world = World::new(SimConfig {
            rng_seed: Some(9),
            ..SimConfig::default()
        })
        .expect("valid config");
        let summary = world.step(1.0 / 60.0);
        assert_eq!(summary.tick, Tick(1));
        assert_eq!(summary.asteroids, world.ids_of(AgentKind::Asteroid).len());
        assert_eq!(summary.ships, world.ids_of(AgentKind::Ship).len());
        assert_eq!(summary.planets, world.ids_of(AgentKind::Planet).len());
        assert_eq!(world.history().len(), 1);
        assert_eq!(world.history().back(), Some(&summary));
    }

    #[test]
    fn history_is_bounded_by_the_configured_capacity() {
        let mut config = quiet_config();
        config.history_capacity = 4;
        let mut world = World::new(config).expect("valid config");
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.history().len(), 4);
        assert_eq!(world.history().front().map(|s| s.tick), Some(Tick(7)));
        assert_eq!(world.history().back().map(|s| s.tick), Some(Tick(10)));
    }

    #[test]
    fn bounds_margins_follow_the_agent_radius() {
        let bounds = WorldBounds::new(20.0, 20.0);
        assert!(bounds.contains(Vec2::new(20.0, -20.0)));
        assert!(!bounds.contains(Vec2::new(20.1, 0.0)));
        assert!(!bounds.is_outside(Vec2::new(20.4, 0.0), 0.5));
        assert!(bounds.is_outside(Vec2::new(20.6, 0.0), 0.5));
    }
}
